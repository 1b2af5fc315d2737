use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use awsutils_common::{
    error::Result,
    types::{ByteRange, ObjectInfo},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: String,
    /// Listing resumes strictly after this key.
    pub start_after: String,
    pub max_keys: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ListObjectsPage {
    pub objects: Vec<ObjectInfo>,
    pub key_count: i32,
    pub is_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CopySource<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
}

/// Remote object-store operations, bound to one region.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn region(&self) -> &str;
    /// A store talking to the same backend in another region.
    fn with_region(&self, region: &str) -> Arc<dyn ObjectStore>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;
    async fn bucket_region(&self, bucket: &str) -> Result<String>;
    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage>;
    /// Fails with a not-found error (see `AwsUtilsError::is_not_found`) when absent.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;
    async fn get_object(&self, bucket: &str, key: &str, range: Option<ByteRange>)
    -> Result<Bytes>;
    /// Whole body as a stream, for objects too large to buffer.
    async fn get_object_stream(&self, bucket: &str, key: &str) -> Result<ByteStream>;
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        acl: Option<&str>,
    ) -> Result<String>;
    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        acl: Option<&str>,
    ) -> Result<String>;
    async fn copy_object(
        &self,
        source: CopySource<'_>,
        bucket: &str,
        key: &str,
        acl: Option<&str>,
    ) -> Result<String>;
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        acl: Option<&str>,
    ) -> Result<String>;
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<String>;
    async fn upload_part_copy(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        source: CopySource<'_>,
        range: ByteRange,
    ) -> Result<String>;
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<String>;
    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str)
    -> Result<()>;
}

/// Rebinds `store` to the region `bucket` actually lives in.
pub async fn store_for_bucket(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
) -> Result<Arc<dyn ObjectStore>> {
    let region = store.bucket_region(bucket).await?;
    if region == store.region() {
        Ok(Arc::clone(store))
    } else {
        Ok(store.with_region(&region))
    }
}
