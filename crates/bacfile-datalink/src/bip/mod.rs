/// BACnet Virtual Link Control header for BACnet/IP.
pub mod bvlc;
/// UDP transport carrying NPDUs inside BVLC frames.
pub mod transport;
