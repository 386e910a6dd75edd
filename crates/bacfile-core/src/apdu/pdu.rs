use crate::encoding::reader::Reader;
use crate::DecodeError;

/// The APDU types of a confirmed file-service exchange, carried in the high
/// nibble of the first APDU octet.
///
/// Unconfirmed requests, simple acks and segment acks never take part in
/// AtomicReadFile or AtomicWriteFile and classify as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    ComplexAck = 3,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl ApduType {
    /// Classifies an APDU by its first octet.
    pub const fn of(first_octet: u8) -> Option<Self> {
        match first_octet >> 4 {
            0 => Some(Self::ConfirmedRequest),
            3 => Some(Self::ComplexAck),
            5 => Some(Self::Error),
            6 => Some(Self::Reject),
            7 => Some(Self::Abort),
            _ => None,
        }
    }

    /// First APDU octet for this type with the given low-nibble flags.
    pub const fn first_octet(self, flags: u8) -> u8 {
        ((self as u8) << 4) | (flags & 0x0F)
    }

    /// Reads the first octet and checks it carries this type, returning the
    /// octet so callers can inspect the flags.
    pub(crate) fn read_first_octet(self, r: &mut Reader<'_>) -> Result<u8, DecodeError> {
        let b0 = r.read_u8()?;
        if Self::of(b0) != Some(self) {
            return Err(DecodeError::InvalidValue);
        }
        Ok(b0)
    }
}
