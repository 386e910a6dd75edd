use crate::EncodeError;

/// Cursor over a caller-owned output buffer. Never grows the buffer.
///
/// A writer can additionally be capped with [`limit_remaining`]: once the cap
/// is reached, further writes fail with [`EncodeError::ExceedsLimit`] instead
/// of [`EncodeError::BufferTooSmall`]. Devices use the cap to keep an APDU
/// inside the requester's max-APDU without encoding into a scratch buffer.
///
/// [`limit_remaining`]: Writer::limit_remaining
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
    limit: Option<usize>,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            limit: None,
        }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Octets that can still be written before hitting the cap or the end of
    /// the buffer.
    pub fn remaining(&self) -> usize {
        self.end().saturating_sub(self.pos)
    }

    pub fn as_written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Allows at most `octets` more octets from the current position.
    pub fn limit_remaining(&mut self, octets: usize) {
        self.limit = Some(self.pos.saturating_add(octets));
    }

    fn end(&self) -> usize {
        match self.limit {
            Some(limit) => limit.min(self.buf.len()),
            None => self.buf.len(),
        }
    }

    fn reserve(&mut self, len: usize) -> Result<usize, EncodeError> {
        let end = self.pos.checked_add(len).ok_or(EncodeError::BufferTooSmall)?;
        match self.limit {
            Some(limit) if end > limit => Err(EncodeError::ExceedsLimit),
            _ if end > self.buf.len() => Err(EncodeError::BufferTooSmall),
            _ => Ok(end),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        let end = self.reserve(1)?;
        self.buf[self.pos] = value;
        self.pos = end;
        Ok(())
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        let end = self.reserve(data.len())?;
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn write_be_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }

    pub fn write_be_u32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;
    use crate::EncodeError;

    #[test]
    fn writes_into_buffer() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        w.write_u8(1).unwrap();
        w.write_be_u16(0x0203).unwrap();
        assert_eq!(w.as_written(), &[1, 2, 3]);
        assert_eq!(w.remaining(), 5);
    }

    #[test]
    fn buffer_end_is_buffer_too_small() {
        let mut buf = [0u8; 2];
        let mut w = Writer::new(&mut buf);
        w.write_u8(1).unwrap();
        assert_eq!(w.write_all(&[2, 3]).unwrap_err(), EncodeError::BufferTooSmall);
        assert_eq!(w.as_written(), &[1]);
    }

    #[test]
    fn cap_applies_from_the_current_position() {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        // NPDU octets are not counted against the APDU cap.
        w.write_all(&[0x01, 0x00]).unwrap();
        w.limit_remaining(3);
        assert_eq!(w.remaining(), 3);
        w.write_all(&[0x30, 0x07, 0x06]).unwrap();
        assert_eq!(w.write_u8(0x31).unwrap_err(), EncodeError::ExceedsLimit);
        assert_eq!(w.as_written(), &[0x01, 0x00, 0x30, 0x07, 0x06]);
    }

    #[test]
    fn cap_larger_than_buffer_still_reports_buffer_end() {
        let mut buf = [0u8; 2];
        let mut w = Writer::new(&mut buf);
        w.limit_remaining(1476);
        assert_eq!(w.remaining(), 2);
        assert_eq!(w.write_all(&[0; 3]).unwrap_err(), EncodeError::BufferTooSmall);
    }
}
