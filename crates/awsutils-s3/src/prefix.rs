use std::{fmt, sync::Arc};

use awsutils_common::error::{AwsUtilsError, Result};
use tracing::{debug, info};

use crate::{
    listing::{self, ObjectPages, SizeSummary, TimeFilter},
    object::S3Object,
    s3url::{join_s3_url, split_s3_url},
    traits::{ObjectStore, store_for_bucket},
};

/// All objects in a bucket whose key starts with `prefix`.
#[derive(Clone)]
pub struct S3ObjectKeyPrefix {
    pub bucket: String,
    pub prefix: String,
    store: Arc<dyn ObjectStore>,
}

impl S3ObjectKeyPrefix {
    pub async fn new(store: Arc<dyn ObjectStore>, bucket: &str, prefix: &str) -> Result<Self> {
        if bucket.is_empty() {
            return Err(AwsUtilsError::IncompleteIdentifier("bucket"));
        }
        let store = store_for_bucket(&store, bucket).await?;
        Ok(Self::bound(store, bucket, prefix))
    }

    /// `store` must already be bound to the bucket's region.
    pub(crate) fn bound(store: Arc<dyn ObjectStore>, bucket: &str, prefix: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            store,
        }
    }

    pub async fn from_url(store: Arc<dyn ObjectStore>, url: &str) -> Result<Self> {
        let (bucket, prefix) = split_s3_url(url)?;
        Self::new(store, &bucket, &prefix).await
    }

    pub fn s3_url(&self) -> Result<String> {
        join_s3_url(&self.bucket, &self.prefix, "prefix")
    }

    pub fn region(&self) -> &str {
        self.store.region()
    }

    pub async fn list_objects(&self, filter: TimeFilter) -> Result<Vec<S3Object>> {
        listing::list_objects(&self.store, &self.bucket, &self.prefix, filter).await
    }

    pub async fn total_size(&self) -> Result<SizeSummary> {
        listing::total_size(self.store.as_ref(), &self.bucket, &self.prefix).await
    }

    /// Deletes every object under the prefix, stopping at the first failure.
    /// Returns the number of objects deleted.
    pub async fn delete_objects(&self) -> Result<u64> {
        let mut keys = Vec::new();
        let mut pages = ObjectPages::new(self.store.as_ref(), &self.bucket, &self.prefix);
        while let Some(page) = pages.next_page().await? {
            keys.extend(page.into_iter().map(|info| info.key));
        }

        let mut deleted = 0_u64;
        for key in &keys {
            self.store.delete_object(&self.bucket, key).await?;
            debug!(bucket = %self.bucket, key = %key, "deleted object");
            deleted += 1;
        }
        info!(bucket = %self.bucket, prefix = %self.prefix, deleted, "deleted objects under prefix");
        Ok(deleted)
    }
}

impl fmt::Debug for S3ObjectKeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ObjectKeyPrefix")
            .field("region", &self.region())
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
