use std::{fmt, sync::Arc};

use awsutils_common::error::{AwsUtilsError, Result};
use serde::Serialize;
use tracing::info;

use crate::{
    listing::{self, SizeSummary, TimeFilter},
    object::S3Object,
    prefix::S3ObjectKeyPrefix,
    s3url::{join_s3_url, split_s3_url},
    traits::{ObjectStore, store_for_bucket},
};

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Bucket {
    pub region: String,
    pub bucket: String,
    pub key_prefix: String,
    #[serde(skip)]
    store: Arc<dyn ObjectStore>,
}

impl S3Bucket {
    /// Creates the bucket in the store's region, then opens it.
    pub async fn create(store: Arc<dyn ObjectStore>, bucket: &str) -> Result<Self> {
        if bucket.is_empty() {
            return Err(AwsUtilsError::IncompleteIdentifier("bucket"));
        }
        store.create_bucket(bucket).await?;
        info!(bucket, region = store.region(), "bucket created");
        Self::open(store, bucket, "").await
    }

    pub async fn open(store: Arc<dyn ObjectStore>, bucket: &str, key_prefix: &str) -> Result<Self> {
        if bucket.is_empty() {
            return Err(AwsUtilsError::IncompleteIdentifier("bucket"));
        }
        let store = store_for_bucket(&store, bucket).await?;
        Ok(Self {
            region: store.region().to_string(),
            bucket: bucket.to_string(),
            key_prefix: key_prefix.to_string(),
            store,
        })
    }

    /// `s3://bucket/prefix`; the key part becomes the listing prefix.
    pub async fn from_url(store: Arc<dyn ObjectStore>, url: &str) -> Result<Self> {
        let (bucket, key_prefix) = split_s3_url(url)?;
        Self::open(store, &bucket, &key_prefix).await
    }

    pub fn s3_url(&self) -> Result<String> {
        join_s3_url(&self.bucket, &self.key_prefix, "prefix")
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn prefix(&self) -> S3ObjectKeyPrefix {
        S3ObjectKeyPrefix::bound(Arc::clone(&self.store), &self.bucket, &self.key_prefix)
    }

    pub async fn list_objects(&self, filter: TimeFilter) -> Result<Vec<S3Object>> {
        listing::list_objects(&self.store, &self.bucket, &self.key_prefix, filter).await
    }

    pub async fn total_size(&self) -> Result<SizeSummary> {
        listing::total_size(self.store.as_ref(), &self.bucket, &self.key_prefix).await
    }
}

impl fmt::Debug for S3Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Bucket")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}
