//! A BACnet device that serves file objects over a data link.
//!
//! [`FileDevice`] answers AtomicReadFile and AtomicWriteFile requests and
//! rejects every other confirmed service. Unconfirmed traffic and network
//! layer messages are ignored.

use crate::error::DeviceError;
use crate::resolver::ObjectResolver;
use crate::response::{FileServiceAck, ReplySlot};
use crate::service::FileServices;
use bacfile_core::apdu::{AbortPdu, ApduType, ConfirmedRequestHeader, ErrorPdu, RejectPdu};
use bacfile_core::encoding::{reader::Reader, writer::Writer};
use bacfile_core::npdu::Npdu;
use bacfile_core::services::atomic_read_file::{AtomicReadFileRequest, SERVICE_ATOMIC_READ_FILE};
use bacfile_core::services::atomic_write_file::{
    AtomicWriteFileRequest, SERVICE_ATOMIC_WRITE_FILE,
};
use bacfile_core::types::{AbortReason, RejectReason};
use bacfile_core::{DecodeError, EncodeError};
use bacfile_datalink::{DataLink, DataLinkAddress, DataLinkError};

/// Largest NPDU carried by BACnet/IP.
const MAX_NPDU_LEN: usize = 1497;

/// What the device sends back for one confirmed request.
#[derive(Debug)]
enum Reply {
    Ack(FileServiceAck),
    Error(ErrorPdu),
    Reject(RejectPdu),
    Abort(AbortPdu),
}

/// File-serving device bound to one data link.
#[derive(Debug)]
pub struct FileDevice<D: DataLink, R: ObjectResolver> {
    datalink: D,
    resolver: R,
}

impl<D: DataLink, R: ObjectResolver> FileDevice<D, R> {
    pub fn new(datalink: D, resolver: R) -> Self {
        Self { datalink, resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn datalink(&self) -> &D {
        &self.datalink
    }

    /// Serves requests until the data link fails with an I/O error.
    ///
    /// Malformed frames and failed replies are logged and skipped.
    pub async fn run(&self) -> Result<(), DeviceError> {
        let mut buf = [0u8; 1500];
        loop {
            let (n, source) = match self.datalink.recv(&mut buf).await {
                Ok(received) => received,
                Err(DataLinkError::Io(e)) => return Err(DataLinkError::Io(e).into()),
                Err(e) => {
                    log::debug!("file device: dropping frame: {e}");
                    continue;
                }
            };
            if let Err(e) = self.handle_frame(&buf[..n], source).await {
                log::debug!("file device: error handling frame from {source}: {e}");
            }
        }
    }

    /// Handles one NPDU received from `source`, replying if it is a
    /// confirmed request.
    pub async fn handle_frame(
        &self,
        frame: &[u8],
        source: DataLinkAddress,
    ) -> Result<(), DeviceError> {
        let mut r = Reader::new(frame);
        let npdu = Npdu::decode(&mut r)?;
        if npdu.is_network_message() || r.is_empty() {
            return Ok(());
        }
        if ApduType::of(r.peek_u8()?) != Some(ApduType::ConfirmedRequest) {
            return Ok(());
        }

        let header = ConfirmedRequestHeader::decode(&mut r)?;
        let reply = if header.segmented {
            log::debug!(
                "file device: segmented request invoke={} from {source}",
                header.invoke_id
            );
            Reply::Abort(AbortPdu::from_server(
                header.invoke_id,
                AbortReason::SegmentationNotSupported,
            ))
        } else {
            self.dispatch(&header, &mut r)
        };

        self.respond(source, &npdu.reply_to(), &header, reply).await
    }

    fn dispatch(&self, header: &ConfirmedRequestHeader, r: &mut Reader<'_>) -> Reply {
        let invoke_id = header.invoke_id;
        let slot = ReplySlot::new();
        let services = FileServices::new(&self.resolver, &slot);

        let handled = match header.service_choice {
            SERVICE_ATOMIC_READ_FILE => {
                let decoded =
                    decode_request(r, |r| AtomicReadFileRequest::decode_after_header(r, invoke_id));
                match decoded {
                    Ok(request) => services.atomic_read_file(&request),
                    Err(reason) => return Reply::Reject(RejectPdu::new(invoke_id, reason)),
                }
            }
            SERVICE_ATOMIC_WRITE_FILE => {
                let decoded = decode_request(r, |r| {
                    AtomicWriteFileRequest::decode_after_header(r, invoke_id)
                });
                match decoded {
                    Ok(request) => services.atomic_write_file(&request),
                    Err(reason) => return Reply::Reject(RejectPdu::new(invoke_id, reason)),
                }
            }
            other => {
                log::debug!("file device: unrecognized service {other} invoke={invoke_id}");
                return Reply::Reject(RejectPdu::new(
                    invoke_id,
                    RejectReason::UnrecognizedService,
                ));
            }
        };

        match handled {
            Ok(()) => match slot.take() {
                Some(ack) => Reply::Ack(ack),
                None => Reply::Abort(AbortPdu::from_server(invoke_id, AbortReason::Other)),
            },
            Err(e) => {
                log::debug!("file device: invoke={invoke_id} failed: {e}");
                Reply::Error(e.to_error_pdu(invoke_id, header.service_choice))
            }
        }
    }

    async fn respond(
        &self,
        destination: DataLinkAddress,
        npdu: &Npdu,
        header: &ConfirmedRequestHeader,
        reply: Reply,
    ) -> Result<(), DeviceError> {
        let mut frame = [0u8; MAX_NPDU_LEN];
        let max_apdu = header.max_apdu_octets();
        let len = match encode_frame(&mut frame, npdu, &reply, max_apdu) {
            Ok(len) => len,
            Err(EncodeError::ExceedsLimit | EncodeError::BufferTooSmall)
                if matches!(reply, Reply::Ack(_)) =>
            {
                log::debug!(
                    "file device: ack for invoke={} exceeds {max_apdu} octets; aborting",
                    header.invoke_id
                );
                let abort = Reply::Abort(AbortPdu::from_server(
                    header.invoke_id,
                    AbortReason::SegmentationNotSupported,
                ));
                encode_frame(&mut frame, npdu, &abort, max_apdu)?
            }
            Err(e) => return Err(e.into()),
        };
        self.datalink.send(destination, &frame[..len]).await?;
        Ok(())
    }
}

/// Decodes service parameters that must fill the rest of the APDU.
fn decode_request<'a, T>(
    r: &mut Reader<'a>,
    decode: impl FnOnce(&mut Reader<'a>) -> Result<T, DecodeError>,
) -> Result<T, RejectReason> {
    let request = decode(r).map_err(|e| {
        log::debug!("file device: undecodable request: {e}");
        e.reject_reason()
    })?;
    if !r.is_empty() {
        log::debug!("file device: {} trailing octet(s) in request", r.remaining());
        return Err(RejectReason::TooManyArguments);
    }
    Ok(request)
}

/// Writes the reply NPDU into `buf` with its APDU capped at `max_apdu`
/// octets, returning the frame length.
fn encode_frame(
    buf: &mut [u8],
    npdu: &Npdu,
    reply: &Reply,
    max_apdu: usize,
) -> Result<usize, EncodeError> {
    let mut w = Writer::new(buf);
    npdu.encode(&mut w)?;
    w.limit_remaining(max_apdu);
    match reply {
        Reply::Ack(ack) => ack.encode(&mut w)?,
        Reply::Error(pdu) => pdu.encode(&mut w)?,
        Reply::Reject(pdu) => pdu.encode(&mut w)?,
        Reply::Abort(pdu) => pdu.encode(&mut w)?,
    }
    Ok(w.position())
}
