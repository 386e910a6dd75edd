#![no_main]

use bacfile_core::apdu::{
    AbortPdu, ApduType, ComplexAckHeader, ConfirmedRequestHeader, ErrorPdu, RejectPdu,
};
use bacfile_core::encoding::reader::Reader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some(&first) = data.first() else {
        return;
    };
    let mut r = Reader::new(data);
    match ApduType::of(first) {
        Some(ApduType::ConfirmedRequest) => {
            if let Ok(hdr) = ConfirmedRequestHeader::decode(&mut r) {
                let _ = hdr.max_apdu_octets();
            }
        }
        Some(ApduType::ComplexAck) => {
            let _ = ComplexAckHeader::decode(&mut r);
        }
        Some(ApduType::Error) => {
            let _ = ErrorPdu::decode(&mut r);
        }
        Some(ApduType::Reject) => {
            let _ = RejectPdu::decode(&mut r);
        }
        Some(ApduType::Abort) => {
            let _ = AbortPdu::decode(&mut r);
        }
        _ => {}
    }
});
