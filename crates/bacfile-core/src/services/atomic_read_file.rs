use crate::apdu::ConfirmedRequestHeader;
use crate::encoding::{
    primitives::{
        decode_app_object_id, decode_app_signed, decode_app_unsigned, encode_app_object_id,
        encode_app_signed, encode_app_unsigned,
    },
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::services::{RECORD_ACCESS_TAG, STREAM_ACCESS_TAG};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

#[cfg(feature = "alloc")]
use crate::apdu::ComplexAckHeader;
#[cfg(feature = "alloc")]
use crate::encoding::{
    primitives::{
        decode_app_boolean, decode_app_octet_string, encode_app_boolean, encode_app_octet_string,
    },
    tag::AppTag,
};
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

pub const SERVICE_ATOMIC_READ_FILE: u8 = 0x06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicReadFileAccessMethod {
    Stream {
        file_start_position: i32,
        requested_octet_count: u32,
    },
    Record {
        file_start_record: i32,
        requested_record_count: u32,
    },
}

impl AtomicReadFileAccessMethod {
    /// Requested start: an octet position or a record index.
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicReadFileRequest {
    pub file_object_id: ObjectId,
    pub access_method: AtomicReadFileAccessMethod,
    pub invoke_id: u8,
}

impl AtomicReadFileRequest {
    pub fn stream(
        file_object_id: ObjectId,
        file_start_position: i32,
        requested_octet_count: u32,
        invoke_id: u8,
    ) -> Self {
        Self {
            file_object_id,
            access_method: AtomicReadFileAccessMethod::Stream {
                file_start_position,
                requested_octet_count,
            },
            invoke_id,
        }
    }

    pub fn record(
        file_object_id: ObjectId,
        file_start_record: i32,
        requested_record_count: u32,
        invoke_id: u8,
    ) -> Self {
        Self {
            file_object_id,
            access_method: AtomicReadFileAccessMethod::Record {
                file_start_record,
                requested_record_count,
            },
            invoke_id,
        }
    }

    /// Encodes the full confirmed-request APDU.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut header = ConfirmedRequestHeader::new(self.invoke_id, SERVICE_ATOMIC_READ_FILE);
        header.segmented_response_accepted = true;
        header.encode(w)?;

        encode_app_object_id(w, self.file_object_id.raw())?;
        let (tag_num, start, count) = match self.access_method {
            AtomicReadFileAccessMethod::Stream {
                file_start_position,
                requested_octet_count,
            } => (STREAM_ACCESS_TAG, file_start_position, requested_octet_count),
            AtomicReadFileAccessMethod::Record {
                file_start_record,
                requested_record_count,
            } => (RECORD_ACCESS_TAG, file_start_record, requested_record_count),
        };
        Tag::Opening { tag_num }.encode(w)?;
        encode_app_signed(w, start)?;
        encode_app_unsigned(w, count)?;
        Tag::Closing { tag_num }.encode(w)
    }

    /// Decodes the service parameters that follow a confirmed-request header.
    ///
    /// The reader is left just past the closing access-method tag so callers
    /// can detect trailing octets.
    pub fn decode_after_header(r: &mut Reader<'_>, invoke_id: u8) -> Result<Self, DecodeError> {
        let file_object_id = ObjectId::from_raw(decode_app_object_id(r)?);
        let access_method = match Tag::decode(r)? {
            Tag::Opening {
                tag_num: STREAM_ACCESS_TAG,
            } => {
                let file_start_position = decode_app_signed(r)?;
                let requested_octet_count = decode_app_unsigned(r)?;
                Tag::expect_closing(r, STREAM_ACCESS_TAG)?;
                AtomicReadFileAccessMethod::Stream {
                    file_start_position,
                    requested_octet_count,
                }
            }
            Tag::Opening {
                tag_num: RECORD_ACCESS_TAG,
            } => {
                let file_start_record = decode_app_signed(r)?;
                let requested_record_count = decode_app_unsigned(r)?;
                Tag::expect_closing(r, RECORD_ACCESS_TAG)?;
                AtomicReadFileAccessMethod::Record {
                    file_start_record,
                    requested_record_count,
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

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicReadFileAckAccess<'a> {
    Stream {
        file_start_position: i32,
        file_data: &'a [u8],
    },
    Record {
        file_start_record: i32,
        returned_record_count: u32,
        file_record_data: Vec<&'a [u8]>,
    },
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicReadFileAck<'a> {
    pub end_of_file: bool,
    pub access_method: AtomicReadFileAckAccess<'a>,
}

#[cfg(feature = "alloc")]
impl<'a> AtomicReadFileAck<'a> {
    /// Encodes the full ComplexAck APDU answering `invoke_id`.
    pub fn encode(&self, w: &mut Writer<'_>, invoke_id: u8) -> Result<(), EncodeError> {
        ComplexAckHeader {
            invoke_id,
            service_choice: SERVICE_ATOMIC_READ_FILE,
        }
        .encode(w)?;

        encode_app_boolean(w, self.end_of_file)?;
        match &self.access_method {
            AtomicReadFileAckAccess::Stream {
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
            AtomicReadFileAckAccess::Record {
                file_start_record,
                returned_record_count,
                file_record_data,
            } => {
                Tag::Opening {
                    tag_num: RECORD_ACCESS_TAG,
                }
                .encode(w)?;
                encode_app_signed(w, *file_start_record)?;
                encode_app_unsigned(w, *returned_record_count)?;
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

    pub fn decode_after_header(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let end_of_file = decode_app_boolean(r)?;

        let access_method = match Tag::decode(r)? {
            Tag::Opening {
                tag_num: STREAM_ACCESS_TAG,
            } => {
                let file_start_position = decode_app_signed(r)?;
                let file_data = decode_app_octet_string(r)?;
                Tag::expect_closing(r, STREAM_ACCESS_TAG)?;
                AtomicReadFileAckAccess::Stream {
                    file_start_position,
                    file_data,
                }
            }
            Tag::Opening {
                tag_num: RECORD_ACCESS_TAG,
            } => {
                let file_start_record = decode_app_signed(r)?;
                let returned_record_count = decode_app_unsigned(r)?;

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
                AtomicReadFileAckAccess::Record {
                    file_start_record,
                    returned_record_count,
                    file_record_data,
                }
            }
            _ => return Err(DecodeError::InvalidTag),
        };

        Ok(Self {
            end_of_file,
            access_method,
        })
    }
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "alloc")]
    use super::{AtomicReadFileAck, AtomicReadFileAckAccess};
    use super::{AtomicReadFileAccessMethod, AtomicReadFileRequest, SERVICE_ATOMIC_READ_FILE};
    #[cfg(feature = "alloc")]
    use crate::apdu::ComplexAckHeader;
    use crate::apdu::ConfirmedRequestHeader;
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{ObjectId, ObjectType};
    use crate::DecodeError;
    #[cfg(feature = "alloc")]
    use alloc::vec;

    #[test]
    fn stream_request_fixture() {
        let req = AtomicReadFileRequest::stream(ObjectId::file(7), 0, 512, 4);
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[
                0x02, 0x05, 0x04, 0x06, 0xC4, 0x02, 0x80, 0x00, 0x07, 0x0E, 0x31, 0x00, 0x22,
                0x02, 0x00, 0x0F,
            ]
        );
    }

    #[test]
    fn record_request_decodes_after_header() {
        let req = AtomicReadFileRequest::record(ObjectId::file(2), -1, 3, 11);
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        let hdr = ConfirmedRequestHeader::decode(&mut r).unwrap();
        assert_eq!(hdr.service_choice, SERVICE_ATOMIC_READ_FILE);
        let decoded = AtomicReadFileRequest::decode_after_header(&mut r, hdr.invoke_id).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded, req);
        assert_eq!(decoded.access_method.start(), -1);
    }

    #[test]
    fn non_file_identifier_still_decodes() {
        let analog = ObjectId::new(ObjectType::Other(2), 1);
        let req = AtomicReadFileRequest::stream(analog, 0, 1, 1);
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        req.encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        ConfirmedRequestHeader::decode(&mut r).unwrap();
        let decoded = AtomicReadFileRequest::decode_after_header(&mut r, 1).unwrap();
        assert_eq!(decoded.file_object_id.object_type(), ObjectType::Other(2));
        assert!(matches!(
            decoded.access_method,
            AtomicReadFileAccessMethod::Stream { .. }
        ));
    }

    #[test]
    fn unknown_access_choice_is_invalid_tag() {
        // object id, then opening tag 2
        let body = [0xC4, 0x02, 0x80, 0x00, 0x01, 0x2E, 0x31, 0x00, 0x21, 0x01, 0x2F];
        let mut r = Reader::new(&body);
        assert_eq!(
            AtomicReadFileRequest::decode_after_header(&mut r, 0).unwrap_err(),
            DecodeError::InvalidTag
        );
    }

    #[test]
    fn truncated_request_is_eof() {
        let body = [0xC4, 0x02, 0x80, 0x00, 0x01, 0x0E, 0x31];
        let mut r = Reader::new(&body);
        assert_eq!(
            AtomicReadFileRequest::decode_after_header(&mut r, 0).unwrap_err(),
            DecodeError::UnexpectedEof
        );
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn stream_ack_fixture() {
        let ack = AtomicReadFileAck {
            end_of_file: true,
            access_method: AtomicReadFileAckAccess::Stream {
                file_start_position: 0,
                file_data: &[1, 2, 3, 4],
            },
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w, 9).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x30, 0x09, 0x06, 0x11, 0x0E, 0x31, 0x00, 0x64, 1, 2, 3, 4, 0x0F]
        );

        let mut r = Reader::new(w.as_written());
        let hdr = ComplexAckHeader::decode(&mut r).unwrap();
        assert_eq!(hdr.invoke_id, 9);
        assert_eq!(AtomicReadFileAck::decode_after_header(&mut r).unwrap(), ack);
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn record_ack_carries_every_record() {
        let ack = AtomicReadFileAck {
            end_of_file: false,
            access_method: AtomicReadFileAckAccess::Record {
                file_start_record: 5,
                returned_record_count: 2,
                file_record_data: vec![&b"alpha"[..], &b""[..]],
            },
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w, 1).unwrap();

        let mut r = Reader::new(w.as_written());
        ComplexAckHeader::decode(&mut r).unwrap();
        let decoded = AtomicReadFileAck::decode_after_header(&mut r).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded, ack);
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn record_ack_rejects_non_octet_record() {
        // eof=false, [1]{ start 0, count 1, unsigned 7 }
        let body = [0x10, 0x1E, 0x31, 0x00, 0x21, 0x01, 0x21, 0x07, 0x1F];
        let mut r = Reader::new(&body);
        assert_eq!(
            AtomicReadFileAck::decode_after_header(&mut r).unwrap_err(),
            DecodeError::InvalidTag
        );
    }
}
