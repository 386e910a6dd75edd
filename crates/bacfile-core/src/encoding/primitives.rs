use crate::encoding::{
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::{DecodeError, EncodeError};

pub fn encode_unsigned(w: &mut Writer<'_>, value: u32) -> Result<usize, EncodeError> {
    let len = match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    };
    let bytes = value.to_be_bytes();
    w.write_all(&bytes[4 - len..])?;
    Ok(len)
}

pub fn decode_unsigned(r: &mut Reader<'_>, len: usize) -> Result<u32, DecodeError> {
    if len == 0 || len > 4 {
        return Err(DecodeError::InvalidLength);
    }
    let mut value = 0u32;
    for byte in r.read_exact(len)? {
        value = (value << 8) | u32::from(*byte);
    }
    Ok(value)
}

pub fn encode_signed(w: &mut Writer<'_>, value: i32) -> Result<usize, EncodeError> {
    let len = match value {
        -128..=127 => 1,
        -32_768..=32_767 => 2,
        -8_388_608..=8_388_607 => 3,
        _ => 4,
    };
    let bytes = value.to_be_bytes();
    w.write_all(&bytes[4 - len..])?;
    Ok(len)
}

pub fn decode_signed(r: &mut Reader<'_>, len: usize) -> Result<i32, DecodeError> {
    if len == 0 || len > 4 {
        return Err(DecodeError::InvalidLength);
    }
    let bytes = r.read_exact(len)?;
    let fill = if (bytes[0] & 0x80) != 0 { 0xFF } else { 0x00 };
    let mut out = [fill; 4];
    out[4 - len..].copy_from_slice(bytes);
    Ok(i32::from_be_bytes(out))
}

fn encode_tagged_unsigned(w: &mut Writer<'_>, tag: Tag, value: u32) -> Result<(), EncodeError> {
    let mut scratch = [0u8; 4];
    let mut tw = Writer::new(&mut scratch);
    let len = encode_unsigned(&mut tw, value)?;
    with_len(tag, len as u32).encode(w)?;
    w.write_all(&scratch[..len])
}

fn encode_tagged_signed(w: &mut Writer<'_>, tag: Tag, value: i32) -> Result<(), EncodeError> {
    let mut scratch = [0u8; 4];
    let mut tw = Writer::new(&mut scratch);
    let len = encode_signed(&mut tw, value)?;
    with_len(tag, len as u32).encode(w)?;
    w.write_all(&scratch[..len])
}

fn with_len(tag: Tag, len: u32) -> Tag {
    match tag {
        Tag::Application { tag, .. } => Tag::Application { tag, len },
        Tag::Context { tag_num, .. } => Tag::Context { tag_num, len },
        other => other,
    }
}

fn app(tag: AppTag) -> Tag {
    Tag::Application { tag, len: 0 }
}

pub fn encode_app_unsigned(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    encode_tagged_unsigned(w, app(AppTag::UnsignedInt), value)
}

pub fn encode_app_enumerated(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    encode_tagged_unsigned(w, app(AppTag::Enumerated), value)
}

pub fn encode_app_signed(w: &mut Writer<'_>, value: i32) -> Result<(), EncodeError> {
    encode_tagged_signed(w, app(AppTag::SignedInt), value)
}

pub fn encode_ctx_signed(w: &mut Writer<'_>, tag_num: u8, value: i32) -> Result<(), EncodeError> {
    encode_tagged_signed(w, Tag::Context { tag_num, len: 0 }, value)
}

/// Booleans carry their value in the length field and have no content octets.
pub fn encode_app_boolean(w: &mut Writer<'_>, value: bool) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Boolean,
        len: u32::from(value),
    }
    .encode(w)
}

pub fn encode_app_object_id(w: &mut Writer<'_>, object_id_raw: u32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::ObjectId,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(object_id_raw)
}

pub fn encode_app_octet_string(w: &mut Writer<'_>, value: &[u8]) -> Result<(), EncodeError> {
    let len = u32::try_from(value.len()).map_err(|_| EncodeError::InvalidLength)?;
    Tag::Application {
        tag: AppTag::OctetString,
        len,
    }
    .encode(w)?;
    w.write_all(value)
}

pub fn decode_app_unsigned(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::UnsignedInt,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_enumerated(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_signed(r: &mut Reader<'_>) -> Result<i32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::SignedInt,
            len,
        } => decode_signed(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_boolean(r: &mut Reader<'_>) -> Result<bool, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Boolean,
            len,
        } if len <= 1 => Ok(len == 1),
        Tag::Application {
            tag: AppTag::Boolean,
            ..
        } => Err(DecodeError::InvalidValue),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_object_id(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::ObjectId,
            len: 4,
        } => r.read_be_u32(),
        Tag::Application {
            tag: AppTag::ObjectId,
            ..
        } => Err(DecodeError::InvalidLength),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_octet_string<'a>(r: &mut Reader<'a>) -> Result<&'a [u8], DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::OctetString,
            len,
        } => r.read_exact(len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

/// Decodes the signed body of a context tag the caller already consumed.
pub fn decode_ctx_signed_body(
    r: &mut Reader<'_>,
    tag: Tag,
    tag_num: u8,
) -> Result<i32, DecodeError> {
    match tag {
        Tag::Context { tag_num: n, len } if n == tag_num => decode_signed(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}
