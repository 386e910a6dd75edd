/// Object type field of a BACnet object identifier.
///
/// A file server only ever names its own file objects and the device that
/// hosts them; every other type number is carried through untouched as
/// [`Other`](Self::Other) so a request naming, say, an analog input can still
/// be decoded and refused by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectType {
    Device,
    File,
    Other(u16),
}

impl ObjectType {
    const DEVICE: u16 = 8;
    const FILE: u16 = 10;

    /// Largest type number that fits the 10-bit field of an identifier.
    pub const MAX_RAW: u16 = 0x03FF;

    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Device => Self::DEVICE,
            Self::File => Self::FILE,
            Self::Other(raw) => raw,
        }
    }

    pub const fn from_u16(value: u16) -> Self {
        match value {
            Self::DEVICE => Self::Device,
            Self::FILE => Self::File,
            raw => Self::Other(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectType;

    #[test]
    fn named_types_use_standard_numbers() {
        assert_eq!(ObjectType::File.to_u16(), 10);
        assert_eq!(ObjectType::Device.to_u16(), 8);
        assert_eq!(ObjectType::from_u16(10), ObjectType::File);
        assert_eq!(ObjectType::from_u16(8), ObjectType::Device);
    }

    #[test]
    fn other_numbers_pass_through() {
        for raw in [0u16, 2, 9, 11, 128, ObjectType::MAX_RAW] {
            let ty = ObjectType::from_u16(raw);
            assert_eq!(ty, ObjectType::Other(raw));
            assert_eq!(ty.to_u16(), raw);
        }
    }

    #[test]
    fn other_cannot_shadow_a_named_type() {
        // `Other(10)` never comes out of decoding, but if built by hand it
        // still encodes as the file type number.
        assert_eq!(ObjectType::from_u16(ObjectType::Other(10).to_u16()), ObjectType::File);
    }
}
