/// Confirmed-service request/response headers and failure PDUs.
pub mod confirmed;
/// APDU type discriminant.
pub mod pdu;

pub use confirmed::{AbortPdu, ComplexAckHeader, ConfirmedRequestHeader, ErrorPdu, RejectPdu};
pub use pdu::ApduType;
