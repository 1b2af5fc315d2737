use awsutils_common::{
    error::{AwsUtilsError, Result},
    types::ByteRange,
};
use serde::Serialize;

/// 100 MiB.
pub const PART_SIZE: u64 = 1024 * 1024 * 100;

/// Upper bound on parts in one multipart upload.
pub const MAX_PARTS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartRange {
    pub part_number: i32,
    pub range: ByteRange,
}

/// Contiguous, ascending ranges covering `[0, total_size)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyPlan {
    pub total_size: u64,
    pub part_size: u64,
    pub parts: Vec<PartRange>,
}

impl CopyPlan {
    pub fn new(total_size: u64, part_size: u64) -> Result<Self> {
        if part_size == 0 {
            return Err(AwsUtilsError::InvalidArgument(
                "part size must be greater than zero".to_string(),
            ));
        }

        let count = total_size.div_ceil(part_size);
        if count > MAX_PARTS {
            return Err(AwsUtilsError::InvalidArgument(format!(
                "object of {total_size} bytes needs {count} parts of {part_size} bytes, more than {MAX_PARTS}"
            )));
        }

        let parts = (0..count)
            .map(|index| {
                let start = index * part_size;
                let end = (start + part_size).min(total_size) - 1;
                PartRange {
                    part_number: index as i32 + 1,
                    range: ByteRange::new(start, end),
                }
            })
            .collect();

        Ok(Self {
            total_size,
            part_size,
            parts,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use awsutils_common::types::ByteRange;

    use super::{CopyPlan, MAX_PARTS, PART_SIZE};

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn splits_into_fixed_parts_with_short_tail() {
        let plan = CopyPlan::new(250 * MIB, PART_SIZE).unwrap();
        let ranges = plan.parts.iter().map(|p| p.range).collect::<Vec<_>>();
        assert_eq!(
            ranges,
            [
                ByteRange::new(0, 104_857_599),
                ByteRange::new(104_857_600, 209_715_199),
                ByteRange::new(209_715_200, 262_143_999),
            ]
        );
        assert_eq!(
            plan.parts.iter().map(|p| p.part_number).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert_eq!(plan.parts[2].range.size(), 50 * MIB);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let plan = CopyPlan::new(200 * MIB, PART_SIZE).unwrap();
        assert_eq!(plan.parts.len(), 2);
        assert_eq!(plan.parts[1].range.end, 200 * MIB - 1);
    }

    #[test]
    fn zero_bytes_has_no_parts() {
        let plan = CopyPlan::new(0, PART_SIZE).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn rejects_degenerate_plans() {
        assert!(CopyPlan::new(10, 0).is_err());
        assert!(CopyPlan::new(MAX_PARTS + 1, 1).is_err());
        assert_eq!(CopyPlan::new(MAX_PARTS, 1).unwrap().parts.len(), MAX_PARTS as usize);
    }
}
