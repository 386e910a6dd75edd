#![no_main]

use bacfile_core::encoding::reader::Reader;
use bacfile_core::services::atomic_read_file::{AtomicReadFileAck, AtomicReadFileRequest};
use bacfile_core::services::atomic_write_file::{AtomicWriteFileAck, AtomicWriteFileRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let mut r = Reader::new(body);
    match selector % 4 {
        0 => {
            let _ = AtomicReadFileRequest::decode_after_header(&mut r, 1);
        }
        1 => {
            let _ = AtomicWriteFileRequest::decode_after_header(&mut r, 1);
        }
        2 => {
            let _ = AtomicReadFileAck::decode_after_header(&mut r);
        }
        _ => {
            let _ = AtomicWriteFileAck::decode_after_header(&mut r);
        }
    }
});
