use bacfile_datalink::BacnetIpTransport;
use bacfile_server::FileDevice;
use bacfile_tools::Manifest;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bacfile-server")]
struct Args {
    /// JSON manifest listing the file objects to serve.
    #[arg(long)]
    manifest: PathBuf,
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    ip: IpAddr,
    #[arg(long, default_value_t = 47808)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let table = Manifest::load_table(&args.manifest)?;
    let transport = BacnetIpTransport::bind(SocketAddr::new(args.ip, args.port)).await?;
    let local = transport.local_addr()?;
    let object_count = table.len();
    let device = FileDevice::new(transport, table);

    println!("serving {object_count} file object(s) on {local}. Ctrl+C to stop.");
    device.run().await?;
    Ok(())
}
