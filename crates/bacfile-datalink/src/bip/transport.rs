use crate::bip::bvlc::{BvlcFunction, BvlcHeader, BVLC_HEADER_LEN};
use crate::{DataLink, DataLinkAddress, DataLinkError};
use bacfile_core::encoding::{reader::Reader, writer::Writer};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;

const MAX_BIP_FRAME_LEN: usize = 1600;

/// BACnet/IP over a single UDP socket. Cloning shares the socket.
#[derive(Debug, Clone)]
pub struct BacnetIpTransport {
    socket: Arc<UdpSocket>,
}

impl BacnetIpTransport {
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, DataLinkError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;
        log::debug!("bacnet/ip bound on {}", socket.local_addr()?);
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        self.socket.local_addr().map_err(DataLinkError::Io)
    }
}

impl DataLink for BacnetIpTransport {
    async fn send(&self, address: DataLinkAddress, payload: &[u8]) -> Result<(), DataLinkError> {
        let addr = address.as_socket_addr();
        let function = match addr.ip() {
            IpAddr::V4(v4) if v4.is_broadcast() => BvlcFunction::OriginalBroadcastNpdu,
            _ => BvlcFunction::OriginalUnicastNpdu,
        };

        let total_len = BVLC_HEADER_LEN
            .checked_add(payload.len())
            .filter(|len| *len <= MAX_BIP_FRAME_LEN)
            .ok_or(DataLinkError::FrameTooLarge)?;

        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let mut w = Writer::new(&mut frame);
        BvlcHeader {
            function,
            length: total_len as u16,
        }
        .encode(&mut w)
        .map_err(|_| DataLinkError::InvalidFrame)?;
        w.write_all(payload)
            .map_err(|_| DataLinkError::FrameTooLarge)?;

        self.socket.send_to(w.as_written(), addr).await?;
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, DataLinkAddress), DataLinkError> {
        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let (n, src) = self.socket.recv_from(&mut frame).await?;
        let mut r = Reader::new(&frame[..n]);
        let hdr = BvlcHeader::decode(&mut r).map_err(|_| DataLinkError::InvalidFrame)?;
        let body = r
            .read_exact(hdr.payload_len())
            .map_err(|_| DataLinkError::InvalidFrame)?;

        let (payload, origin) = match hdr.function {
            BvlcFunction::OriginalUnicastNpdu
            | BvlcFunction::OriginalBroadcastNpdu
            | BvlcFunction::DistributeBroadcastToNetwork => (body, src),
            BvlcFunction::ForwardedNpdu => {
                if body.len() < 6 {
                    return Err(DataLinkError::InvalidFrame);
                }
                let origin_ip = Ipv4Addr::new(body[0], body[1], body[2], body[3]);
                let origin_port = u16::from_be_bytes([body[4], body[5]]);
                (&body[6..], SocketAddr::new(IpAddr::V4(origin_ip), origin_port))
            }
            BvlcFunction::Unknown(v) => return Err(DataLinkError::UnsupportedBvlcFunction(v)),
            BvlcFunction::Result => return Err(DataLinkError::InvalidFrame),
        };

        if payload.len() > buf.len() {
            return Err(DataLinkError::FrameTooLarge);
        }
        buf[..payload.len()].copy_from_slice(payload);
        Ok((payload.len(), DataLinkAddress::Ip(origin)))
    }
}

#[cfg(test)]
mod tests {
    use super::BacnetIpTransport;
    use crate::bip::bvlc::{BvlcFunction, BvlcHeader, BVLC_TYPE_BIP};
    use crate::{DataLink, DataLinkAddress, DataLinkError};
    use bacfile_core::encoding::{reader::Reader, writer::Writer};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::net::UdpSocket;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn send_wraps_payload_in_unicast_bvlc() {
        let transport = BacnetIpTransport::bind(loopback()).await.unwrap();
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        transport
            .send(DataLinkAddress::Ip(peer_addr), &[0x01, 0x00, 0x30])
            .await
            .unwrap();

        let mut rx = [0u8; 32];
        let (n, _) = peer.recv_from(&mut rx).await.unwrap();
        let mut r = Reader::new(&rx[..n]);
        let hdr = BvlcHeader::decode(&mut r).unwrap();
        assert_eq!(hdr.function, BvlcFunction::OriginalUnicastNpdu);
        assert_eq!(hdr.length, 7);
        assert_eq!(r.read_rest(), &[0x01, 0x00, 0x30]);
    }

    #[tokio::test]
    async fn recv_strips_unicast_header() {
        let transport = BacnetIpTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(loopback()).await.unwrap();

        sender
            .send_to(&[BVLC_TYPE_BIP, 0x0A, 0x00, 0x06, 0x01, 0x04], target)
            .await
            .unwrap();

        let mut out = [0u8; 16];
        let (n, src) = transport.recv(&mut out).await.unwrap();
        assert_eq!(&out[..n], &[0x01, 0x04]);
        assert_eq!(src, DataLinkAddress::Ip(sender.local_addr().unwrap()));
    }

    #[tokio::test]
    async fn recv_forwarded_npdu_returns_forwarded_origin() {
        let transport = BacnetIpTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(loopback()).await.unwrap();

        let mut frame = [0u8; 64];
        let mut w = Writer::new(&mut frame);
        BvlcHeader {
            function: BvlcFunction::ForwardedNpdu,
            length: 4 + 6 + 3,
        }
        .encode(&mut w)
        .unwrap();
        w.write_all(&[10, 1, 2, 3]).unwrap();
        w.write_be_u16(47808).unwrap();
        w.write_all(&[1, 2, 3]).unwrap();
        sender.send_to(w.as_written(), target).await.unwrap();

        let mut out = [0u8; 16];
        let (n, src) = transport.recv(&mut out).await.unwrap();
        assert_eq!(&out[..n], &[1, 2, 3]);
        assert_eq!(
            src,
            DataLinkAddress::Ip(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
                47808
            ))
        );
    }

    #[tokio::test]
    async fn truncated_frame_is_invalid() {
        let transport = BacnetIpTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(loopback()).await.unwrap();

        sender
            .send_to(&[BVLC_TYPE_BIP, 0x0A, 0x00, 0x10, 0x01], target)
            .await
            .unwrap();

        let mut out = [0u8; 16];
        let err = transport.recv(&mut out).await.unwrap_err();
        assert!(matches!(err, DataLinkError::InvalidFrame));
    }

    #[tokio::test]
    async fn unknown_bvlc_function_errors() {
        let transport = BacnetIpTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(loopback()).await.unwrap();

        sender
            .send_to(&[BVLC_TYPE_BIP, 0x99, 0x00, 0x04], target)
            .await
            .unwrap();

        let mut out = [0u8; 16];
        let err = transport.recv(&mut out).await.unwrap_err();
        assert!(matches!(err, DataLinkError::UnsupportedBvlcFunction(0x99)));
    }
}
