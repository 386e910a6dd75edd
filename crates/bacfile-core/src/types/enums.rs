/// Maximum APDU length accepted by a device, as carried in a confirmed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MaxApdu {
    UpTo50 = 0,
    UpTo128 = 1,
    UpTo206 = 2,
    UpTo480 = 3,
    UpTo1024 = 4,
    UpTo1476 = 5,
}

impl MaxApdu {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::UpTo50),
            1 => Some(Self::UpTo128),
            2 => Some(Self::UpTo206),
            3 => Some(Self::UpTo480),
            4 => Some(Self::UpTo1024),
            5 => Some(Self::UpTo1476),
            _ => None,
        }
    }

    /// Largest APDU, in octets, the peer accepts.
    pub const fn octets(self) -> usize {
        match self {
            Self::UpTo50 => 50,
            Self::UpTo128 => 128,
            Self::UpTo206 => 206,
            Self::UpTo480 => 480,
            Self::UpTo1024 => 1024,
            Self::UpTo1476 => 1476,
        }
    }
}

/// BACnet error class reported in Error PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ErrorClass {
    Device = 0,
    Object = 1,
    Property = 2,
    Resources = 3,
    Security = 4,
    Services = 5,
    Vt = 6,
    Communication = 7,
}

impl ErrorClass {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Device),
            1 => Some(Self::Object),
            2 => Some(Self::Property),
            3 => Some(Self::Resources),
            4 => Some(Self::Security),
            5 => Some(Self::Services),
            6 => Some(Self::Vt),
            7 => Some(Self::Communication),
            _ => None,
        }
    }
}

/// BACnet error codes raised by the file services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum ErrorCode {
    Other = 0,
    FileAccessDenied = 5,
    InvalidFileAccessMethod = 10,
    InvalidFileStartPosition = 11,
    OperationalProblem = 25,
    UnknownObject = 31,
    InconsistentObjectType = 130,
}

impl ErrorCode {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Other),
            5 => Some(Self::FileAccessDenied),
            10 => Some(Self::InvalidFileAccessMethod),
            11 => Some(Self::InvalidFileStartPosition),
            25 => Some(Self::OperationalProblem),
            31 => Some(Self::UnknownObject),
            130 => Some(Self::InconsistentObjectType),
            _ => None,
        }
    }
}

/// Reason octet of a Reject PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    Other = 0,
    BufferOverflow = 1,
    InconsistentParameters = 2,
    InvalidParameterDataType = 3,
    InvalidTag = 4,
    MissingRequiredParameter = 5,
    ParameterOutOfRange = 6,
    TooManyArguments = 7,
    UndefinedEnumeration = 8,
    UnrecognizedService = 9,
}

/// Reason octet of an Abort PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AbortReason {
    Other = 0,
    BufferOverflow = 1,
    InvalidApduInThisState = 2,
    PreemptedByHigherPriorityTask = 3,
    SegmentationNotSupported = 4,
}
