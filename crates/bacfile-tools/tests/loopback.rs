//! Client and device talking over real UDP sockets on localhost.

use bacfile_core::types::{ErrorClass, ErrorCode, ObjectId};
use bacfile_datalink::{BacnetIpTransport, DataLinkAddress};
use bacfile_server::{AtomicReadFileResult, AtomicWriteFileResult, FileDevice};
use bacfile_tools::{ClientError, FileClient, Manifest};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tempfile::TempDir;

fn loopback() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
}

#[tokio::test]
async fn manifest_files_are_served_over_bacnet_ip() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("trend.csv"), b"t,v\n1,20.5\n").unwrap();
    let manifest_path = dir.path().join("files.json");
    std::fs::write(
        &manifest_path,
        r#"{"files": [
            {"instance": 1, "access": "stream", "path": "trend.csv"},
            {"instance": 2, "access": "record", "records": ["alpha", "beta"]},
            {"instance": 3, "access": "stream", "read_only": true, "data": "fixed"}
        ]}"#,
    )
    .unwrap();

    let table = Manifest::load_table(&manifest_path).unwrap();
    let device_link = BacnetIpTransport::bind(loopback()).await.unwrap();
    let device_addr = DataLinkAddress::Ip(device_link.local_addr().unwrap());
    let device = FileDevice::new(device_link, table);

    let client = FileClient::with_datalink(BacnetIpTransport::bind(loopback()).await.unwrap())
        .with_response_timeout(Duration::from_secs(2));

    let exchange = async {
        let appended = client
            .write_stream(device_addr, ObjectId::file(1), -1, b"2,21.0\n")
            .await
            .unwrap();
        assert_eq!(
            appended,
            AtomicWriteFileResult::Stream {
                file_start_position: 11
            }
        );

        let read = client
            .read_stream(device_addr, ObjectId::file(1), 4, 100)
            .await
            .unwrap();
        assert_eq!(
            read,
            AtomicReadFileResult::Stream {
                end_of_file: true,
                file_start_position: 4,
                file_data: b"1,20.5\n2,21.0\n".to_vec(),
            }
        );

        let records = client
            .read_record(device_addr, ObjectId::file(2), 1, 5)
            .await
            .unwrap();
        assert_eq!(
            records,
            AtomicReadFileResult::Record {
                end_of_file: true,
                file_start_record: 1,
                returned_record_count: 1,
                file_record_data: vec![b"beta".to_vec()],
            }
        );

        let denied = client
            .write_stream(device_addr, ObjectId::file(3), 0, b"x")
            .await
            .unwrap_err();
        assert!(matches!(
            denied,
            ClientError::RemoteServiceError {
                error_class: Some(ErrorClass::Services),
                error_code: Some(ErrorCode::FileAccessDenied),
                ..
            }
        ));

        let missing = client
            .read_stream(device_addr, ObjectId::file(42), 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            ClientError::RemoteServiceError {
                error_class: Some(ErrorClass::Object),
                error_code: Some(ErrorCode::UnknownObject),
                ..
            }
        ));
    };

    tokio::select! {
        result = device.run() => panic!("device loop exited: {result:?}"),
        () = exchange => {}
    }

    assert_eq!(
        std::fs::read(dir.path().join("trend.csv")).unwrap(),
        b"t,v\n1,20.5\n2,21.0\n"
    );
}
