use crate::apdu::ApduType;
use crate::encoding::{
    primitives::{decode_unsigned, encode_app_enumerated},
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::{AbortReason, ErrorClass, ErrorCode, MaxApdu, RejectReason};
use crate::{DecodeError, EncodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedRequestHeader {
    pub segmented: bool,
    pub more_follows: bool,
    pub segmented_response_accepted: bool,
    pub max_segments: u8,
    pub max_apdu: u8,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
}

impl ConfirmedRequestHeader {
    /// Unsegmented request header accepting a 1476-octet reply.
    pub const fn new(invoke_id: u8, service_choice: u8) -> Self {
        Self {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: false,
            max_segments: 0,
            max_apdu: MaxApdu::UpTo1476 as u8,
            invoke_id,
            sequence_number: None,
            proposed_window_size: None,
            service_choice,
        }
    }

    /// Largest reply APDU the requester accepts. Reserved codes fall back to
    /// the 50-octet minimum every device must handle.
    pub fn max_apdu_octets(&self) -> usize {
        MaxApdu::from_u8(self.max_apdu & 0x0f)
            .unwrap_or(MaxApdu::UpTo50)
            .octets()
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut b0 = ApduType::ConfirmedRequest.first_octet(0);
        if self.segmented {
            b0 |= 0b0000_1000;
        }
        if self.more_follows {
            b0 |= 0b0000_0100;
        }
        if self.segmented_response_accepted {
            b0 |= 0b0000_0010;
        }

        w.write_u8(b0)?;
        w.write_u8((self.max_segments << 4) | (self.max_apdu & 0x0f))?;
        w.write_u8(self.invoke_id)?;
        if self.segmented {
            w.write_u8(self.sequence_number.unwrap_or(0))?;
            w.write_u8(self.proposed_window_size.unwrap_or(1))?;
        }
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = ApduType::ConfirmedRequest.read_first_octet(r)?;
        let segmented = (b0 & 0b0000_1000) != 0;
        let seg_apdu = r.read_u8()?;
        let invoke_id = r.read_u8()?;
        let (sequence_number, proposed_window_size) = if segmented {
            (Some(r.read_u8()?), Some(r.read_u8()?))
        } else {
            (None, None)
        };
        Ok(Self {
            segmented,
            more_follows: (b0 & 0b0000_0100) != 0,
            segmented_response_accepted: (b0 & 0b0000_0010) != 0,
            max_segments: (seg_apdu >> 4) & 0x07,
            max_apdu: seg_apdu & 0x0f,
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice: r.read_u8()?,
        })
    }
}

/// Header of an unsegmented ComplexAck. The file services never segment acks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexAckHeader {
    pub invoke_id: u8,
    pub service_choice: u8,
}

impl ComplexAckHeader {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(ApduType::ComplexAck.first_octet(0))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = ApduType::ComplexAck.read_first_octet(r)?;
        if (b0 & 0b0000_1000) != 0 {
            return Err(DecodeError::Segmented);
        }
        Ok(Self {
            invoke_id: r.read_u8()?,
            service_choice: r.read_u8()?,
        })
    }
}

/// Error PDU. Class and code stay raw so proprietary values survive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPdu {
    pub invoke_id: u8,
    pub service_choice: u8,
    pub error_class: u32,
    pub error_code: u32,
}

impl ErrorPdu {
    pub const fn new(
        invoke_id: u8,
        service_choice: u8,
        error_class: ErrorClass,
        error_code: ErrorCode,
    ) -> Self {
        Self {
            invoke_id,
            service_choice,
            error_class: error_class.to_u32(),
            error_code: error_code.to_u32(),
        }
    }

    pub fn class(&self) -> Option<ErrorClass> {
        ErrorClass::from_u32(self.error_class)
    }

    pub fn code(&self) -> Option<ErrorCode> {
        ErrorCode::from_u32(self.error_code)
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(ApduType::Error.first_octet(0))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)?;
        encode_app_enumerated(w, self.error_class)?;
        encode_app_enumerated(w, self.error_code)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        ApduType::Error.read_first_octet(r)?;
        let invoke_id = r.read_u8()?;
        let service_choice = r.read_u8()?;
        let (error_class, error_code) = match Tag::decode(r)? {
            Tag::Opening { tag_num: 0 } => {
                let class_tag = Tag::decode(r)?;
                let class = decode_error_value(r, class_tag, 0)?;
                let code_tag = Tag::decode(r)?;
                let code = decode_error_value(r, code_tag, 1)?;
                Tag::expect_closing(r, 0)?;
                (class, code)
            }
            first_tag => {
                let class = decode_error_value(r, first_tag, 0)?;
                let code_tag = Tag::decode(r)?;
                (class, decode_error_value(r, code_tag, 1)?)
            }
        };
        Ok(Self {
            invoke_id,
            service_choice,
            error_class,
            error_code,
        })
    }
}

fn decode_error_value(
    r: &mut Reader<'_>,
    tag: Tag,
    expected_ctx_tag: u8,
) -> Result<u32, DecodeError> {
    match tag {
        Tag::Context { tag_num, len } if tag_num == expected_ctx_tag => {
            decode_unsigned(r, len as usize)
        }
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectPdu {
    pub invoke_id: u8,
    pub reason: u8,
}

impl RejectPdu {
    pub const fn new(invoke_id: u8, reason: RejectReason) -> Self {
        Self {
            invoke_id,
            reason: reason as u8,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(ApduType::Reject.first_octet(0))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        ApduType::Reject.read_first_octet(r)?;
        Ok(Self {
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortPdu {
    pub server: bool,
    pub invoke_id: u8,
    pub reason: u8,
}

impl AbortPdu {
    /// Abort sent by the serving device.
    pub const fn from_server(invoke_id: u8, reason: AbortReason) -> Self {
        Self {
            server: true,
            invoke_id,
            reason: reason as u8,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(ApduType::Abort.first_octet(u8::from(self.server)))?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = ApduType::Abort.read_first_octet(r)?;
        Ok(Self {
            server: (b0 & 0x01) != 0,
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}
