use std::fmt::Write as _;

pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

pub fn decode_hex(input: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let bytes = input.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err("hex data must have even length".into());
    }
    let mut out = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks(2) {
        let hex = std::str::from_utf8(pair)?;
        out.push(u8::from_str_radix(hex, 16)?);
    }
    Ok(out)
}
