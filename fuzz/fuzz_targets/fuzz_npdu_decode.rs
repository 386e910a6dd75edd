#![no_main]

use bacfile_core::encoding::reader::Reader;
use bacfile_core::npdu::Npdu;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut r = Reader::new(data);
    if let Ok(npdu) = Npdu::decode(&mut r) {
        let _ = npdu.reply_to();
    }
});
