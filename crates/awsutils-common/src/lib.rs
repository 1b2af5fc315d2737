pub mod error;
pub mod types;

pub use error::{AwsUtilsError, Result};
pub use types::{ByteRange, ObjectInfo};
