use bacfile_core::types::ObjectId;
use bacfile_datalink::DataLinkAddress;
use bacfile_server::AtomicWriteFileResult;
use bacfile_tools::hex::decode_hex;
use bacfile_tools::FileClient;
use clap::{Parser, ValueEnum};
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, ValueEnum)]
enum ModeArg {
    Stream,
    Record,
}

#[derive(Parser, Debug)]
#[command(name = "bacnet-writefile")]
struct Args {
    #[arg(long)]
    ip: IpAddr,
    #[arg(long, default_value_t = 47808)]
    port: u16,
    #[arg(long)]
    instance: u32,
    #[arg(long, value_enum, default_value = "stream")]
    mode: ModeArg,
    /// Start position or record; -1 appends.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    start: i32,
    /// Payload as hex. In record mode each occurrence is one record.
    #[arg(long)]
    data_hex: Vec<String>,
    #[arg(long)]
    data_file: Option<PathBuf>,
    /// Reply timeout in milliseconds.
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

fn load_payload(args: &Args) -> Result<Vec<Vec<u8>>, Box<dyn std::error::Error>> {
    match (args.data_hex.is_empty(), &args.data_file) {
        (false, None) => args.data_hex.iter().map(|hex| decode_hex(hex)).collect(),
        (true, Some(path)) => Ok(vec![fs::read(path)?]),
        (false, Some(_)) => Err("use either --data-hex or --data-file, not both".into()),
        (true, None) => Err("missing payload: provide --data-hex or --data-file".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let payload = load_payload(&args)?;
    let client = FileClient::new()
        .await?
        .with_response_timeout(Duration::from_millis(args.timeout_ms));
    let addr = DataLinkAddress::Ip((args.ip, args.port).into());
    let file_object = ObjectId::file(args.instance);

    let result = match args.mode {
        ModeArg::Stream => {
            let data = payload.concat();
            client
                .write_stream(addr, file_object, args.start, &data)
                .await?
        }
        ModeArg::Record => {
            let records: Vec<&[u8]> = payload.iter().map(Vec::as_slice).collect();
            client
                .write_record(addr, file_object, args.start, &records)
                .await?
        }
    };

    match result {
        AtomicWriteFileResult::Stream {
            file_start_position,
        } => {
            println!("write stream acknowledged at start_position={file_start_position}");
        }
        AtomicWriteFileResult::Record { file_start_record } => {
            println!("write record acknowledged at start_record={file_start_record}");
        }
    }
    Ok(())
}
