use bacfile_core::types::ObjectId;
use bacfile_datalink::DataLinkAddress;
use bacfile_server::AtomicReadFileResult;
use bacfile_tools::hex::to_hex;
use bacfile_tools::FileClient;
use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone, ValueEnum)]
enum ModeArg {
    Stream,
    Record,
}

#[derive(Parser, Debug)]
#[command(name = "bacnet-readfile")]
struct Args {
    #[arg(long)]
    ip: IpAddr,
    #[arg(long, default_value_t = 47808)]
    port: u16,
    #[arg(long)]
    instance: u32,
    #[arg(long, value_enum, default_value = "stream")]
    mode: ModeArg,
    #[arg(long, default_value_t = 0)]
    start: i32,
    #[arg(long, default_value_t = 256)]
    count: u32,
    /// Reply timeout in milliseconds.
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = FileClient::new()
        .await?
        .with_response_timeout(Duration::from_millis(args.timeout_ms));
    let addr = DataLinkAddress::Ip((args.ip, args.port).into());
    let file_object = ObjectId::file(args.instance);
    let result = match args.mode {
        ModeArg::Stream => {
            client
                .read_stream(addr, file_object, args.start, args.count)
                .await?
        }
        ModeArg::Record => {
            client
                .read_record(addr, file_object, args.start, args.count)
                .await?
        }
    };

    match result {
        AtomicReadFileResult::Stream {
            end_of_file,
            file_start_position,
            file_data,
        } => {
            println!(
                "mode=stream eof={end_of_file} start={file_start_position} bytes={}",
                file_data.len()
            );
            println!("{}", to_hex(&file_data));
        }
        AtomicReadFileResult::Record {
            end_of_file,
            file_start_record,
            returned_record_count,
            file_record_data,
        } => {
            println!(
                "mode=record eof={end_of_file} start_record={file_start_record} returned={returned_record_count}"
            );
            for (idx, record) in file_record_data.iter().enumerate() {
                println!("record[{idx}] {}", to_hex(record));
            }
        }
    }
    Ok(())
}
