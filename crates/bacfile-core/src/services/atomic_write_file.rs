use crate::apdu::ComplexAckHeader;
use crate::encoding::{
    primitives::{decode_ctx_signed_body, encode_ctx_signed},
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::services::{RECORD_ACCESS_TAG, STREAM_ACCESS_TAG};
use crate::{DecodeError, EncodeError};

#[cfg(feature = "alloc")]
use crate::apdu::ConfirmedRequestHeader;
#[cfg(feature = "alloc")]
use crate::encoding::{
    primitives::{
        decode_app_object_id, decode_app_octet_string, decode_app_signed, decode_app_unsigned,
        encode_app_object_id, encode_app_octet_string, encode_app_signed, encode_app_unsigned,
    },
    tag::AppTag,
};
#[cfg(feature = "alloc")]
use crate::types::ObjectId;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

pub const SERVICE_ATOMIC_WRITE_FILE: u8 = 0x07;

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicWriteFileAccessMethod<'a> {
    Stream {
        file_start_position: i32,
        file_data: &'a [u8],
    },
    /// `record_count` is carried as sent; it is not forced to match the
    /// number of records in `file_record_data`.
    Record {
        file_start_record: i32,
        record_count: u32,
        file_record_data: Vec<&'a [u8]>,
    },
}

#[cfg(feature = "alloc")]
impl AtomicWriteFileAccessMethod<'_> {
    pub const fn start(&self) -> i32 {
        match *self {
            Self::Stream {
                file_start_position,
                ..
            } => file_start_position,
            Self::Record {
                file_start_record, ..
            } => file_start_record,
        }
    }
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicWriteFileRequest<'a> {
    pub file_object_id: ObjectId,
    pub access_method: AtomicWriteFileAccessMethod<'a>,
    pub invoke_id: u8,
}

#[cfg(feature = "alloc")]
impl<'a> AtomicWriteFileRequest<'a> {
    pub fn stream(
        file_object_id: ObjectId,
        file_start_position: i32,
        file_data: &'a [u8],
        invoke_id: u8,
    ) -> Self {
        Self {
            file_object_id,
            access_method: AtomicWriteFileAccessMethod::Stream {
                file_start_position,
                file_data,
            },
            invoke_id,
        }
    }

    pub fn record(
        file_object_id: ObjectId,
        file_start_record: i32,
        file_record_data: Vec<&'a [u8]>,
        invoke_id: u8,
    ) -> Self {
        Self {
            file_object_id,
            access_method: AtomicWriteFileAccessMethod::Record {
                file_start_record,
                record_count: file_record_data.len() as u32,
                file_record_data,
            },
            invoke_id,
        }
    }

    /// Encodes the full confirmed-request APDU.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        ConfirmedRequestHeader::new(self.invoke_id, SERVICE_ATOMIC_WRITE_FILE).encode(w)?;

        encode_app_object_id(w, self.file_object_id.raw())?;
        match &self.access_method {
            AtomicWriteFileAccessMethod::Stream {
                file_start_position,
                file_data,
            } => {
                Tag::Opening {
                    tag_num: STREAM_ACCESS_TAG,
                }
                .encode(w)?;
                encode_app_signed(w, *file_start_position)?;
                encode_app_octet_string(w, file_data)?;
                Tag::Closing {
                    tag_num: STREAM_ACCESS_TAG,
                }
                .encode(w)
            }
            AtomicWriteFileAccessMethod::Record {
                file_start_record,
                record_count,
                file_record_data,
            } => {
                Tag::Opening {
                    tag_num: RECORD_ACCESS_TAG,
                }
                .encode(w)?;
                encode_app_signed(w, *file_start_record)?;
                encode_app_unsigned(w, *record_count)?;
                for record in file_record_data {
                    encode_app_octet_string(w, record)?;
                }
                Tag::Closing {
                    tag_num: RECORD_ACCESS_TAG,
                }
                .encode(w)
            }
        }
    }

    /// Decodes the service parameters that follow a confirmed-request header.
    /// Record and stream payloads borrow from the frame.
    pub fn decode_after_header(r: &mut Reader<'a>, invoke_id: u8) -> Result<Self, DecodeError> {
        let file_object_id = ObjectId::from_raw(decode_app_object_id(r)?);
        let access_method = match Tag::decode(r)? {
            Tag::Opening {
                tag_num: STREAM_ACCESS_TAG,
            } => {
                let file_start_position = decode_app_signed(r)?;
                let file_data = decode_app_octet_string(r)?;
                Tag::expect_closing(r, STREAM_ACCESS_TAG)?;
                AtomicWriteFileAccessMethod::Stream {
                    file_start_position,
                    file_data,
                }
            }
            Tag::Opening {
                tag_num: RECORD_ACCESS_TAG,
            } => {
                let file_start_record = decode_app_signed(r)?;
                let record_count = decode_app_unsigned(r)?;
                let mut file_record_data = Vec::new();
                loop {
                    match Tag::decode(r)? {
                        Tag::Closing {
                            tag_num: RECORD_ACCESS_TAG,
                        } => break,
                        Tag::Application {
                            tag: AppTag::OctetString,
                            len,
                        } => file_record_data.push(r.read_exact(len as usize)?),
                        _ => return Err(DecodeError::InvalidTag),
                    }
                }
                AtomicWriteFileAccessMethod::Record {
                    file_start_record,
                    record_count,
                    file_record_data,
                }
            }
            _ => return Err(DecodeError::InvalidTag),
        };
        Ok(Self {
            file_object_id,
            access_method,
            invoke_id,
        })
    }
}

/// The start actually used by the device, which may differ from the request
/// (an append reports where the data landed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicWriteFileAck {
    Stream { file_start_position: i32 },
    Record { file_start_record: i32 },
}

impl AtomicWriteFileAck {
    /// Encodes the full ComplexAck APDU answering `invoke_id`.
    pub fn encode(&self, w: &mut Writer<'_>, invoke_id: u8) -> Result<(), EncodeError> {
        ComplexAckHeader {
            invoke_id,
            service_choice: SERVICE_ATOMIC_WRITE_FILE,
        }
        .encode(w)?;
        match *self {
            Self::Stream {
                file_start_position,
            } => encode_ctx_signed(w, STREAM_ACCESS_TAG, file_start_position),
            Self::Record { file_start_record } => {
                encode_ctx_signed(w, RECORD_ACCESS_TAG, file_start_record)
            }
        }
    }

    /// Accepts the plain context-tagged form and, for interoperability with
    /// devices that wrap it, the constructed form.
    pub fn decode_after_header(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match Tag::decode(r)? {
            tag @ Tag::Context {
                tag_num: STREAM_ACCESS_TAG,
                ..
            } => Ok(Self::Stream {
                file_start_position: decode_ctx_signed_body(r, tag, STREAM_ACCESS_TAG)?,
            }),
            tag @ Tag::Context {
                tag_num: RECORD_ACCESS_TAG,
                ..
            } => Ok(Self::Record {
                file_start_record: decode_ctx_signed_body(r, tag, RECORD_ACCESS_TAG)?,
            }),
            Tag::Opening { tag_num } if tag_num <= RECORD_ACCESS_TAG => {
                let inner = Tag::decode(r)?;
                let start = decode_ctx_signed_body(r, inner, 0)?;
                Tag::expect_closing(r, tag_num)?;
                Ok(if tag_num == STREAM_ACCESS_TAG {
                    Self::Stream {
                        file_start_position: start,
                    }
                } else {
                    Self::Record {
                        file_start_record: start,
                    }
                })
            }
            _ => Err(DecodeError::InvalidTag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AtomicWriteFileAck, SERVICE_ATOMIC_WRITE_FILE};
    #[cfg(feature = "alloc")]
    use super::{AtomicWriteFileAccessMethod, AtomicWriteFileRequest};
    use crate::apdu::ComplexAckHeader;
    #[cfg(feature = "alloc")]
    use crate::apdu::ConfirmedRequestHeader;
    use crate::encoding::{reader::Reader, writer::Writer};
    #[cfg(feature = "alloc")]
    use crate::types::ObjectId;
    use crate::DecodeError;
    #[cfg(feature = "alloc")]
    use alloc::vec;

    #[cfg(feature = "alloc")]
    #[test]
    fn stream_request_fixture() {
        let req = AtomicWriteFileRequest::stream(ObjectId::file(3), 128, &[0xAA, 0xBB, 0xCC], 5);
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[
                0x00, 0x05, 0x05, 0x07, 0xC4, 0x02, 0x80, 0x00, 0x03, 0x0E, 0x32, 0x00, 0x80,
                0x63, 0xAA, 0xBB, 0xCC, 0x0F,
            ]
        );

        let mut r = Reader::new(w.as_written());
        let hdr = ConfirmedRequestHeader::decode(&mut r).unwrap();
        assert_eq!(hdr.service_choice, SERVICE_ATOMIC_WRITE_FILE);
        let decoded = AtomicWriteFileRequest::decode_after_header(&mut r, hdr.invoke_id).unwrap();
        assert_eq!(decoded, req);
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn record_request_keeps_declared_count() {
        let req = AtomicWriteFileRequest {
            file_object_id: ObjectId::file(1),
            access_method: AtomicWriteFileAccessMethod::Record {
                file_start_record: -1,
                record_count: 3,
                file_record_data: vec![&b"a"[..], &b"bc"[..]],
            },
            invoke_id: 2,
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        ConfirmedRequestHeader::decode(&mut r).unwrap();
        let decoded = AtomicWriteFileRequest::decode_after_header(&mut r, 2).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded, req);
        assert_eq!(decoded.access_method.start(), -1);
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn record_constructor_counts_records() {
        let req = AtomicWriteFileRequest::record(ObjectId::file(1), 0, vec![&[1u8][..]; 4], 0);
        match req.access_method {
            AtomicWriteFileAccessMethod::Record { record_count, .. } => assert_eq!(record_count, 4),
            other => panic!("unexpected access: {other:?}"),
        }
    }

    #[test]
    fn stream_ack_fixture() {
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        AtomicWriteFileAck::Stream {
            file_start_position: 128,
        }
        .encode(&mut w, 2)
        .unwrap();
        assert_eq!(w.as_written(), &[0x30, 0x02, 0x07, 0x0A, 0x00, 0x80]);

        let mut r = Reader::new(w.as_written());
        let hdr = ComplexAckHeader::decode(&mut r).unwrap();
        assert_eq!(hdr.service_choice, SERVICE_ATOMIC_WRITE_FILE);
        assert_eq!(
            AtomicWriteFileAck::decode_after_header(&mut r).unwrap(),
            AtomicWriteFileAck::Stream {
                file_start_position: 128
            }
        );
    }

    #[test]
    fn record_ack_negative_start() {
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        AtomicWriteFileAck::Record {
            file_start_record: -1,
        }
        .encode(&mut w, 0)
        .unwrap();
        let mut r = Reader::new(&w.as_written()[3..]);
        assert_eq!(
            AtomicWriteFileAck::decode_after_header(&mut r).unwrap(),
            AtomicWriteFileAck::Record {
                file_start_record: -1
            }
        );
    }

    #[test]
    fn wrapped_ack_form_decodes() {
        let mut r = Reader::new(&[0x1E, 0x09, 0x07, 0x1F]);
        assert_eq!(
            AtomicWriteFileAck::decode_after_header(&mut r).unwrap(),
            AtomicWriteFileAck::Record {
                file_start_record: 7
            }
        );
    }

    #[test]
    fn unknown_ack_choice_is_invalid_tag() {
        let mut r = Reader::new(&[0x29, 0x01]);
        assert_eq!(
            AtomicWriteFileAck::decode_after_header(&mut r).unwrap_err(),
            DecodeError::InvalidTag
        );
    }
}
