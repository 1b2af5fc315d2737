pub mod bucket;
pub mod client;
pub mod copy;
pub mod keys;
pub mod listing;
pub mod notification;
pub mod object;
pub mod prefix;
pub mod s3url;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use bucket::S3Bucket;
pub use client::S3Client;
pub use copy::{CopyOptions, CopyPlan, CopyReport, CopyStrategy, MultipartCopier, PART_SIZE};
pub use keys::{needs_rename, rename_unsafe_key, sanitize_key};
pub use listing::{ObjectPages, SizeSummary, TimeFilter};
pub use notification::{EventTarget, S3EventMessage};
pub use object::S3Object;
pub use prefix::S3ObjectKeyPrefix;
pub use s3url::{format_s3_url, split_s3_url};
pub use traits::{ObjectStore, store_for_bucket};
