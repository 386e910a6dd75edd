#![no_main]

use bacfile_core::encoding::reader::Reader;
use bacfile_datalink::bip::bvlc::BvlcHeader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut r = Reader::new(data);
    if let Ok(hdr) = BvlcHeader::decode(&mut r) {
        let _ = r.read_exact(hdr.payload_len());
    }
});
