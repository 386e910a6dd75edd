//! Minimal async client for the two file services.

use bacfile_core::apdu::{AbortPdu, ApduType, ComplexAckHeader, ErrorPdu, RejectPdu};
use bacfile_core::encoding::{reader::Reader, writer::Writer};
use bacfile_core::npdu::Npdu;
use bacfile_core::services::atomic_read_file::{
    AtomicReadFileAck, AtomicReadFileRequest, SERVICE_ATOMIC_READ_FILE,
};
use bacfile_core::services::atomic_write_file::{
    AtomicWriteFileAck, AtomicWriteFileRequest, SERVICE_ATOMIC_WRITE_FILE,
};
use bacfile_core::types::{ErrorClass, ErrorCode, ObjectId};
use bacfile_datalink::{BacnetIpTransport, DataLink, DataLinkAddress, DataLinkError};
use bacfile_server::{AtomicReadFileResult, AtomicWriteFileResult};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};

const MAX_NPDU_LEN: usize = 1497;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] bacfile_core::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bacfile_core::DecodeError),
    #[error("request timed out")]
    Timeout,
    #[error("remote service error for service choice {service_choice} (class {error_class_raw}, code {error_code_raw})")]
    RemoteServiceError {
        service_choice: u8,
        error_class_raw: u32,
        error_code_raw: u32,
        error_class: Option<ErrorClass>,
        error_code: Option<ErrorCode>,
    },
    #[error("remote reject reason {reason}")]
    RemoteReject { reason: u8 },
    #[error("remote abort reason {reason} (server={server})")]
    RemoteAbort { reason: u8, server: bool },
}

fn remote_service_error(err: ErrorPdu) -> ClientError {
    ClientError::RemoteServiceError {
        service_choice: err.service_choice,
        error_class_raw: err.error_class,
        error_code_raw: err.error_code,
        error_class: err.class(),
        error_code: err.code(),
    }
}

/// Issues AtomicReadFile / AtomicWriteFile requests and waits for the
/// matching reply. One request is in flight at a time.
#[derive(Debug)]
pub struct FileClient<D: DataLink> {
    datalink: D,
    invoke_id: Mutex<u8>,
    request_io_lock: Mutex<()>,
    response_timeout: Duration,
}

impl FileClient<BacnetIpTransport> {
    /// Client on an ephemeral BACnet/IP port.
    pub async fn new() -> Result<Self, ClientError> {
        let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        let datalink = BacnetIpTransport::bind(bind_addr).await?;
        Ok(Self::with_datalink(datalink))
    }
}

impl<D: DataLink> FileClient<D> {
    pub fn with_datalink(datalink: D) -> Self {
        Self {
            datalink,
            invoke_id: Mutex::new(1),
            request_io_lock: Mutex::new(()),
            response_timeout: Duration::from_secs(3),
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    async fn next_invoke_id(&self) -> u8 {
        let mut lock = self.invoke_id.lock().await;
        let id = *lock;
        *lock = lock.wrapping_add(1);
        if *lock == 0 {
            *lock = 1;
        }
        id
    }

    pub async fn read_stream(
        &self,
        address: DataLinkAddress,
        file_object_id: ObjectId,
        file_start_position: i32,
        requested_octet_count: u32,
    ) -> Result<AtomicReadFileResult, ClientError> {
        let invoke_id = self.next_invoke_id().await;
        let request = AtomicReadFileRequest::stream(
            file_object_id,
            file_start_position,
            requested_octet_count,
            invoke_id,
        );
        self.atomic_read_file(address, request).await
    }

    pub async fn read_record(
        &self,
        address: DataLinkAddress,
        file_object_id: ObjectId,
        file_start_record: i32,
        requested_record_count: u32,
    ) -> Result<AtomicReadFileResult, ClientError> {
        let invoke_id = self.next_invoke_id().await;
        let request = AtomicReadFileRequest::record(
            file_object_id,
            file_start_record,
            requested_record_count,
            invoke_id,
        );
        self.atomic_read_file(address, request).await
    }

    async fn atomic_read_file(
        &self,
        address: DataLinkAddress,
        request: AtomicReadFileRequest,
    ) -> Result<AtomicReadFileResult, ClientError> {
        let mut tx = [0u8; MAX_NPDU_LEN];
        let mut w = Writer::new(&mut tx);
        Npdu::expecting_reply().encode(&mut w)?;
        request.encode(&mut w)?;

        let payload = self
            .await_complex_ack_payload_or_error(
                address,
                w.as_written(),
                request.invoke_id,
                SERVICE_ATOMIC_READ_FILE,
            )
            .await?;
        let mut r = Reader::new(&payload);
        Ok(AtomicReadFileAck::decode_after_header(&mut r)?.into())
    }

    pub async fn write_stream(
        &self,
        address: DataLinkAddress,
        file_object_id: ObjectId,
        file_start_position: i32,
        file_data: &[u8],
    ) -> Result<AtomicWriteFileResult, ClientError> {
        let invoke_id = self.next_invoke_id().await;
        let request = AtomicWriteFileRequest::stream(
            file_object_id,
            file_start_position,
            file_data,
            invoke_id,
        );
        self.atomic_write_file(address, request).await
    }

    pub async fn write_record(
        &self,
        address: DataLinkAddress,
        file_object_id: ObjectId,
        file_start_record: i32,
        file_record_data: &[&[u8]],
    ) -> Result<AtomicWriteFileResult, ClientError> {
        let invoke_id = self.next_invoke_id().await;
        let request = AtomicWriteFileRequest::record(
            file_object_id,
            file_start_record,
            file_record_data.to_vec(),
            invoke_id,
        );
        self.atomic_write_file(address, request).await
    }

    async fn atomic_write_file(
        &self,
        address: DataLinkAddress,
        request: AtomicWriteFileRequest<'_>,
    ) -> Result<AtomicWriteFileResult, ClientError> {
        let mut tx = [0u8; MAX_NPDU_LEN];
        let mut w = Writer::new(&mut tx);
        Npdu::expecting_reply().encode(&mut w)?;
        request.encode(&mut w)?;

        let payload = self
            .await_complex_ack_payload_or_error(
                address,
                w.as_written(),
                request.invoke_id,
                SERVICE_ATOMIC_WRITE_FILE,
            )
            .await?;
        let mut r = Reader::new(&payload);
        Ok(AtomicWriteFileAck::decode_after_header(&mut r)?.into())
    }

    async fn recv_ignoring_invalid_frame(
        &self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> Result<(usize, DataLinkAddress), ClientError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ClientError::Timeout);
            }

            match timeout(remaining, self.datalink.recv(buf)).await {
                Err(_) => return Err(ClientError::Timeout),
                Ok(Err(DataLinkError::InvalidFrame)) => continue,
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(v)) => return Ok(v),
            }
        }
    }

    /// Sends `tx` and returns the service parameters of the matching
    /// ComplexAck. Replies from other peers or for other invocations are
    /// skipped.
    async fn await_complex_ack_payload_or_error(
        &self,
        address: DataLinkAddress,
        tx: &[u8],
        invoke_id: u8,
        service_choice: u8,
    ) -> Result<Vec<u8>, ClientError> {
        let _io_lock = self.request_io_lock.lock().await;
        let deadline = Instant::now() + self.response_timeout;
        log::debug!("file client: invoke={invoke_id} service={service_choice} -> {address}");
        self.datalink.send(address, tx).await?;

        loop {
            let mut rx = [0u8; 1500];
            let (n, src) = self.recv_ignoring_invalid_frame(&mut rx, deadline).await?;
            if src != address {
                continue;
            }

            let mut r = Reader::new(&rx[..n]);
            let npdu = Npdu::decode(&mut r)?;
            if npdu.is_network_message() || r.is_empty() {
                continue;
            }
            match ApduType::of(r.peek_u8()?) {
                Some(ApduType::ComplexAck) => {
                    let ack = ComplexAckHeader::decode(&mut r)?;
                    if ack.invoke_id != invoke_id || ack.service_choice != service_choice {
                        continue;
                    }
                    return Ok(r.read_rest().to_vec());
                }
                Some(ApduType::Error) => {
                    let err = ErrorPdu::decode(&mut r)?;
                    if err.invoke_id == invoke_id && err.service_choice == service_choice {
                        return Err(remote_service_error(err));
                    }
                }
                Some(ApduType::Reject) => {
                    let rej = RejectPdu::decode(&mut r)?;
                    if rej.invoke_id == invoke_id {
                        return Err(ClientError::RemoteReject { reason: rej.reason });
                    }
                }
                Some(ApduType::Abort) => {
                    let abort = AbortPdu::decode(&mut r)?;
                    if abort.invoke_id == invoke_id {
                        return Err(ClientError::RemoteAbort {
                            reason: abort.reason,
                            server: abort.server,
                        });
                    }
                }
                _ => continue,
            }
        }
    }
}
