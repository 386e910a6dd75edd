pub mod enums;
pub mod object_id;
pub mod object_type;

pub use enums::{AbortReason, ErrorClass, ErrorCode, MaxApdu, RejectReason};
pub use object_id::ObjectId;
pub use object_type::ObjectType;
