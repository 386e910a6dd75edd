use crate::types::RejectReason;
use core::fmt;

/// Failure to encode a frame into a caller-owned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The output buffer ended before the frame did.
    BufferTooSmall,
    /// The frame crossed a cap set with `Writer::limit_remaining`, typically
    /// the peer's max-APDU.
    ExceedsLimit,
    /// A length does not fit its wire field (an octet string longer than
    /// `u32::MAX`, or an NPDU address longer than six octets).
    InvalidLength,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small"),
            Self::ExceedsLimit => f.write_str("frame exceeds size limit"),
            Self::InvalidLength => f.write_str("invalid length"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Failure to decode a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEof,
    InvalidTag,
    InvalidLength,
    InvalidValue,
    /// A segmented ComplexAck; neither file service segments its acks.
    Segmented,
}

impl DecodeError {
    /// Reject reason a device answers an undecodable request with.
    ///
    /// A request cut short is missing a parameter; anything else is a
    /// malformed tag.
    pub const fn reject_reason(self) -> RejectReason {
        match self {
            Self::UnexpectedEof => RejectReason::MissingRequiredParameter,
            _ => RejectReason::InvalidTag,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => f.write_str("unexpected end of input"),
            Self::InvalidTag => f.write_str("invalid tag"),
            Self::InvalidLength => f.write_str("invalid length"),
            Self::InvalidValue => f.write_str("invalid value"),
            Self::Segmented => f.write_str("segmented ack"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}
