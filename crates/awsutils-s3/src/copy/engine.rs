use std::sync::Arc;

use awsutils_common::error::{AwsUtilsError, Result};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::plan::{CopyPlan, PART_SIZE, PartRange};
use crate::traits::{CompletedPart, CopySource, ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CopyStrategy {
    /// Parts are copied server-side with `UploadPartCopy`.
    SameRegion,
    /// Parts are downloaded and re-uploaded one at a time.
    CrossRegion,
}

impl CopyStrategy {
    pub fn select(source_region: &str, target_region: &str) -> Self {
        if source_region == target_region {
            Self::SameRegion
        } else {
            Self::CrossRegion
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Canned ACL forwarded to the upload or copy call.
    pub acl: Option<String>,
    /// Abort the open multipart upload when a later step fails.
    pub abort_on_failure: bool,
}

impl CopyOptions {
    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    pub fn abort_on_failure(mut self, abort: bool) -> Self {
        self.abort_on_failure = abort;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub strategy: CopyStrategy,
    /// `None` when no multipart upload was needed.
    pub upload_id: Option<String>,
    pub parts: Vec<CompletedPart>,
    pub total_size: u64,
    pub etag: String,
}

/// Duplicates one object into another bucket/key through a multipart upload.
///
/// `source` must be bound to the source bucket's region and `target` to the
/// target bucket's region; the strategy follows from comparing the two.
pub struct MultipartCopier {
    source: Arc<dyn ObjectStore>,
    target: Arc<dyn ObjectStore>,
    part_size: u64,
    options: CopyOptions,
}

struct Destination<'a> {
    bucket: &'a str,
    key: &'a str,
    upload_id: &'a str,
}

impl MultipartCopier {
    pub fn new(source: Arc<dyn ObjectStore>, target: Arc<dyn ObjectStore>) -> Self {
        Self {
            source,
            target,
            part_size: PART_SIZE,
            options: CopyOptions::default(),
        }
    }

    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    pub fn with_options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategy(&self) -> CopyStrategy {
        CopyStrategy::select(self.source.region(), self.target.region())
    }

    pub async fn copy(
        &self,
        source: CopySource<'_>,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<CopyReport> {
        let strategy = self.strategy();
        let total_size = self.source.head_object(source.bucket, source.key).await?.size;
        let plan = CopyPlan::new(total_size, self.part_size)?;
        info!(
            source_bucket = source.bucket,
            source_key = source.key,
            target_bucket,
            target_key,
            ?strategy,
            total_size,
            parts = plan.parts.len(),
            "starting multipart copy"
        );

        if plan.is_empty() {
            return self
                .copy_empty(strategy, source, target_bucket, target_key)
                .await;
        }

        let acl = self.options.acl.as_deref();
        let upload_id = self
            .target
            .create_multipart_upload(target_bucket, target_key, acl)
            .await?;
        let destination = Destination {
            bucket: target_bucket,
            key: target_key,
            upload_id: &upload_id,
        };

        match self.transfer(strategy, &plan, source, &destination).await {
            Ok((parts, etag)) => {
                info!(target_bucket, target_key, upload_id = %upload_id, "multipart copy completed");
                Ok(CopyReport {
                    strategy,
                    upload_id: Some(upload_id.clone()),
                    parts,
                    total_size,
                    etag,
                })
            }
            Err(err) => {
                self.release(&destination, &err).await;
                Err(err)
            }
        }
    }

    async fn copy_empty(
        &self,
        strategy: CopyStrategy,
        source: CopySource<'_>,
        target_bucket: &str,
        target_key: &str,
    ) -> Result<CopyReport> {
        let acl = self.options.acl.as_deref();
        let etag = match strategy {
            CopyStrategy::SameRegion => {
                self.target
                    .copy_object(source, target_bucket, target_key, acl)
                    .await?
            }
            CopyStrategy::CrossRegion => {
                self.target
                    .put_object(target_bucket, target_key, Bytes::new(), acl)
                    .await?
            }
        };
        debug!(target_bucket, target_key, "copied empty object without multipart upload");

        Ok(CopyReport {
            strategy,
            upload_id: None,
            parts: Vec::new(),
            total_size: 0,
            etag,
        })
    }

    async fn transfer(
        &self,
        strategy: CopyStrategy,
        plan: &CopyPlan,
        source: CopySource<'_>,
        destination: &Destination<'_>,
    ) -> Result<(Vec<CompletedPart>, String)> {
        let mut parts = Vec::with_capacity(plan.parts.len());
        for part in &plan.parts {
            let etag = match strategy {
                CopyStrategy::SameRegion => self.copy_part(source, destination, part).await?,
                CopyStrategy::CrossRegion => self.relay_part(source, destination, part).await?,
            };
            debug!(
                upload_id = destination.upload_id,
                part_number = part.part_number,
                range = %part.range.header_value(),
                "copied part"
            );
            parts.push(CompletedPart {
                part_number: part.part_number,
                etag,
            });
        }

        let etag = self
            .target
            .complete_multipart_upload(
                destination.bucket,
                destination.key,
                destination.upload_id,
                &parts,
            )
            .await?;
        Ok((parts, etag))
    }

    async fn copy_part(
        &self,
        source: CopySource<'_>,
        destination: &Destination<'_>,
        part: &PartRange,
    ) -> Result<String> {
        self.target
            .upload_part_copy(
                destination.bucket,
                destination.key,
                destination.upload_id,
                part.part_number,
                source,
                part.range,
            )
            .await
    }

    async fn relay_part(
        &self,
        source: CopySource<'_>,
        destination: &Destination<'_>,
        part: &PartRange,
    ) -> Result<String> {
        let data = self
            .source
            .get_object(source.bucket, source.key, Some(part.range))
            .await?;
        if data.len() as u64 != part.range.size() {
            return Err(AwsUtilsError::InvalidResponse {
                service: "s3",
                message: format!(
                    "expected {} bytes for part {} of {}/{}, received {}",
                    part.range.size(),
                    part.part_number,
                    source.bucket,
                    source.key,
                    data.len()
                ),
            });
        }

        self.target
            .upload_part(
                destination.bucket,
                destination.key,
                destination.upload_id,
                part.part_number,
                data,
            )
            .await
    }

    async fn release(&self, destination: &Destination<'_>, cause: &AwsUtilsError) {
        if self.options.abort_on_failure {
            match self
                .target
                .abort_multipart_upload(destination.bucket, destination.key, destination.upload_id)
                .await
            {
                Ok(()) => {
                    warn!(
                        bucket = destination.bucket,
                        key = destination.key,
                        upload_id = destination.upload_id,
                        error = %cause,
                        "multipart copy failed; upload aborted"
                    );
                    return;
                }
                Err(abort_err) => {
                    warn!(
                        upload_id = destination.upload_id,
                        error = %abort_err,
                        "failed to abort multipart upload"
                    );
                }
            }
        }

        warn!(
            warning = "ResourceLeakWarning",
            bucket = destination.bucket,
            key = destination.key,
            upload_id = destination.upload_id,
            error = %cause,
            "multipart copy failed; upload left open and must be aborted by the caller"
        );
    }
}
