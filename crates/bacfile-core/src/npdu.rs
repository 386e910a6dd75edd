use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// BACnet network layer protocol version (always `0x01`).
pub const NPDU_VERSION: u8 = 0x01;

const CONTROL_NETWORK_MESSAGE: u8 = 0x80;
const CONTROL_HAS_DESTINATION: u8 = 0x20;
const CONTROL_HAS_SOURCE: u8 = 0x08;
const CONTROL_EXPECTING_REPLY: u8 = 0x04;
const CONTROL_PRIORITY_MASK: u8 = 0x03;

/// A network-layer address consisting of a network number and a MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpduAddress {
    /// The DNET/SNET network number.
    pub network: u16,
    /// MAC address bytes (up to 6).
    pub mac: [u8; 6],
    /// Number of valid bytes in `mac`.
    pub mac_len: u8,
}

/// BACnet Network Protocol Data Unit (NPDU) header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Npdu {
    pub control: u8,
    pub destination: Option<NpduAddress>,
    pub source: Option<NpduAddress>,
    pub hop_count: Option<u8>,
    pub message_type: Option<u8>,
    pub vendor_id: Option<u16>,
}

impl Npdu {
    pub const fn new(control: u8) -> Self {
        Self {
            control,
            destination: None,
            source: None,
            hop_count: None,
            message_type: None,
            vendor_id: None,
        }
    }

    /// Header for a confirmed request sent on the local network.
    pub const fn expecting_reply() -> Self {
        Self::new(CONTROL_EXPECTING_REPLY)
    }

    pub const fn is_network_message(&self) -> bool {
        (self.control & CONTROL_NETWORK_MESSAGE) != 0
    }

    pub const fn expects_reply(&self) -> bool {
        (self.control & CONTROL_EXPECTING_REPLY) != 0
    }

    /// Header for the reply to a request that arrived with this header.
    ///
    /// A routed request (one that carries SNET/SADR) is answered back through
    /// the router by turning its source into the reply's destination. The
    /// message priority is kept.
    pub fn reply_to(&self) -> Self {
        let priority = self.control & CONTROL_PRIORITY_MASK;
        match self.source {
            Some(source) => Self {
                control: CONTROL_HAS_DESTINATION | priority,
                destination: Some(source),
                hop_count: Some(255),
                ..Self::new(0)
            },
            None => Self::new(priority),
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(NPDU_VERSION)?;
        w.write_u8(self.control)?;

        if let Some(dest) = self.destination {
            encode_addr(w, dest)?;
        }
        if let Some(src) = self.source {
            encode_addr(w, src)?;
        }
        if self.destination.is_some() {
            w.write_u8(self.hop_count.unwrap_or(255))?;
        }
        if self.is_network_message() {
            w.write_u8(self.message_type.unwrap_or(0))?;
            if matches!(self.message_type, Some(0x80..=0xFF)) {
                w.write_be_u16(self.vendor_id.unwrap_or(0))?;
            }
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != NPDU_VERSION {
            return Err(DecodeError::InvalidValue);
        }

        let control = r.read_u8()?;
        let has_dest = (control & CONTROL_HAS_DESTINATION) != 0;
        let has_src = (control & CONTROL_HAS_SOURCE) != 0;

        let destination = if has_dest {
            Some(decode_addr(r)?)
        } else {
            None
        };
        let source = if has_src { Some(decode_addr(r)?) } else { None };
        let hop_count = if has_dest { Some(r.read_u8()?) } else { None };

        let (message_type, vendor_id) = if (control & CONTROL_NETWORK_MESSAGE) != 0 {
            let mt = r.read_u8()?;
            let vid = if mt >= 0x80 {
                Some(r.read_be_u16()?)
            } else {
                None
            };
            (Some(mt), vid)
        } else {
            (None, None)
        };

        Ok(Self {
            control,
            destination,
            source,
            hop_count,
            message_type,
            vendor_id,
        })
    }
}

fn encode_addr(w: &mut Writer<'_>, addr: NpduAddress) -> Result<(), EncodeError> {
    if addr.mac_len as usize > addr.mac.len() {
        return Err(EncodeError::InvalidLength);
    }
    w.write_be_u16(addr.network)?;
    w.write_u8(addr.mac_len)?;
    w.write_all(&addr.mac[..addr.mac_len as usize])
}

fn decode_addr(r: &mut Reader<'_>) -> Result<NpduAddress, DecodeError> {
    let network = r.read_be_u16()?;
    let mac_len = r.read_u8()?;
    if mac_len as usize > 6 {
        return Err(DecodeError::InvalidLength);
    }
    let mut mac = [0u8; 6];
    mac[..mac_len as usize].copy_from_slice(r.read_exact(mac_len as usize)?);
    Ok(NpduAddress {
        network,
        mac,
        mac_len,
    })
}

#[cfg(test)]
mod tests {
    use super::{Npdu, NpduAddress};
    use crate::encoding::{reader::Reader, writer::Writer};

    #[test]
    fn local_request_reply_has_no_routing() {
        let req = Npdu::expecting_reply();
        assert!(req.expects_reply());
        let reply = req.reply_to();
        assert_eq!(reply, Npdu::new(0));

        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        reply.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x01, 0x00]);
    }

    #[test]
    fn routed_request_reply_targets_source() {
        let source = NpduAddress {
            network: 5,
            mac: [0x21, 0, 0, 0, 0, 0],
            mac_len: 1,
        };
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        Npdu {
            control: 0x0C,
            source: Some(source),
            ..Npdu::new(0)
        }
        .encode(&mut w)
        .unwrap();
        assert_eq!(w.as_written(), &[0x01, 0x0C, 0x00, 0x05, 0x01, 0x21]);

        let mut r = Reader::new(w.as_written());
        let req = Npdu::decode(&mut r).unwrap();
        let reply = req.reply_to();
        assert_eq!(reply.destination, Some(source));
        assert_eq!(reply.source, None);

        let mut out = [0u8; 16];
        let mut w = Writer::new(&mut out);
        reply.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x01, 0x20, 0x00, 0x05, 0x01, 0x21, 0xFF]);
    }

    #[test]
    fn network_message_vendor_id_only_for_vendor_types() {
        let mut p = Npdu::new(0x80);
        p.message_type = Some(0x80);
        p.vendor_id = Some(260);

        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        p.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        let dec = Npdu::decode(&mut r).unwrap();
        assert!(dec.is_network_message());
        assert_eq!(dec.message_type, Some(0x80));
        assert_eq!(dec.vendor_id, Some(260));
    }
}
