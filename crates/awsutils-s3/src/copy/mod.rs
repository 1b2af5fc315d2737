pub mod engine;
pub mod plan;

pub use engine::{CopyOptions, CopyReport, CopyStrategy, MultipartCopier};
pub use plan::{CopyPlan, MAX_PARTS, PART_SIZE, PartRange};
