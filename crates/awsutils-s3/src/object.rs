use std::{fmt, path::Path, sync::Arc};

use aws_sdk_s3::primitives::ByteStream;
use awsutils_common::{
    error::{AwsUtilsError, Result},
    types::ObjectInfo,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncBufRead;
use tracing::{debug, info};

use crate::{
    copy::{CopyOptions, CopyReport, MultipartCopier},
    keys::rename_unsafe_key,
    notification::S3EventMessage,
    s3url::{format_s3_url, split_s3_url},
    traits::{CopySource, ObjectStore, store_for_bucket},
};

/// Snapshot of one object. Metadata fields are meaningful only when `exists`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Object {
    pub region: String,
    pub bucket: String,
    pub key: String,
    pub file_extension: String,
    pub file_type: String,
    pub exists: bool,
    pub etag: String,
    pub size: u64,
    pub storage_class: String,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(skip)]
    store: Arc<dyn ObjectStore>,
}

impl S3Object {
    /// Resolves the bucket region and the object's metadata.
    ///
    /// A missing key yields `exists == false`; other failures are returned.
    pub async fn new(store: Arc<dyn ObjectStore>, bucket: &str, key: &str) -> Result<Self> {
        if bucket.is_empty() || key.is_empty() {
            return Err(AwsUtilsError::IncompleteIdentifier("key"));
        }

        let store = store_for_bucket(&store, bucket).await?;
        match store.head_object(bucket, key).await {
            Ok(info) => Ok(Self::from_info(store, info)),
            Err(err) if err.is_not_found() => {
                debug!(bucket, key, "object does not exist");
                Ok(Self::absent(store, bucket, key))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn from_url(store: Arc<dyn ObjectStore>, url: &str) -> Result<Self> {
        let (bucket, key) = split_s3_url(url)?;
        Self::new(store, &bucket, &key).await
    }

    pub async fn from_event_bytes(store: Arc<dyn ObjectStore>, payload: &[u8]) -> Result<Self> {
        let message = S3EventMessage::from_slice(payload)?;
        Self::from_event(store, &message).await
    }

    /// Resolves the object named by the first record and tags it with the event name.
    pub async fn from_event(store: Arc<dyn ObjectStore>, message: &S3EventMessage) -> Result<Self> {
        let target = message.target()?;
        let mut object = Self::new(store, &target.bucket, &target.key).await?;
        object.event_name = Some(target.event_name);
        Ok(object)
    }

    /// Builds an existing object from listing metadata. `store` must already
    /// be bound to the bucket's region.
    pub fn from_info(store: Arc<dyn ObjectStore>, info: ObjectInfo) -> Self {
        let mut object = Self::absent(store, &info.bucket, &info.key);
        object.exists = true;
        object.etag = info.etag;
        object.size = info.size;
        object.storage_class = info.storage_class;
        object.last_modified = Some(info.last_modified);
        object
    }

    fn absent(store: Arc<dyn ObjectStore>, bucket: &str, key: &str) -> Self {
        let (file_extension, file_type) = file_extension(key);
        Self {
            region: store.region().to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            file_extension,
            file_type,
            exists: false,
            etag: String::new(),
            size: 0,
            storage_class: String::new(),
            last_modified: None,
            event_name: None,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Last `/`-separated segment of the key.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    pub fn s3_url(&self) -> Result<String> {
        format_s3_url(&self.bucket, &self.key)
    }

    pub async fn refresh(&self) -> Result<Self> {
        Self::new(Arc::clone(&self.store), &self.bucket, &self.key).await
    }

    fn source(&self) -> Result<CopySource<'_>> {
        if !self.exists {
            return Err(AwsUtilsError::NotFound {
                bucket: self.bucket.clone(),
                key: self.key.clone(),
            });
        }
        Ok(CopySource {
            bucket: &self.bucket,
            key: &self.key,
        })
    }

    /// Single server-side copy call.
    pub async fn copy(&self, bucket: &str, key: &str, acl: Option<&str>) -> Result<Self> {
        let source = self.source()?;
        let target = store_for_bucket(&self.store, bucket).await?;
        target.copy_object(source, bucket, key, acl).await?;
        info!(from = %self.key, bucket, key, "copied object");
        Self::new(target, bucket, key).await
    }

    /// Copies through a multipart upload; works for objects of any size and
    /// across regions.
    pub async fn multipart_copy(
        &self,
        bucket: &str,
        key: &str,
        options: CopyOptions,
    ) -> Result<(Self, CopyReport)> {
        let source = self.source()?;
        let target = store_for_bucket(&self.store, bucket).await?;
        let report = MultipartCopier::new(Arc::clone(&self.store), Arc::clone(&target))
            .with_options(options)
            .copy(source, bucket, key)
            .await?;
        let copied = Self::new(target, bucket, key).await?;
        Ok((copied, report))
    }

    /// Copy to `key` in the same bucket, then delete this object.
    ///
    /// Not atomic: when the delete fails both objects remain. Renaming onto
    /// the current key is a no-op.
    pub async fn rename(&self, key: &str, options: CopyOptions) -> Result<Self> {
        if key == self.key {
            debug!(bucket = %self.bucket, key, "rename target equals source key");
            return Ok(self.clone());
        }
        let (renamed, _) = self.multipart_copy(&self.bucket, key, options).await?;
        self.delete().await?;
        info!(bucket = %self.bucket, from = %self.key, to = key, "renamed object");
        Ok(renamed)
    }

    /// Renames the object when its key contains unsafe characters.
    pub async fn sanitize(&self, options: CopyOptions) -> Result<Self> {
        match rename_unsafe_key(&self.key) {
            Some(key) => self.rename(&key, options).await,
            None => Ok(self.clone()),
        }
    }

    pub async fn delete(&self) -> Result<()> {
        self.store.delete_object(&self.bucket, &self.key).await
    }

    pub async fn download_bytes(&self) -> Result<Bytes> {
        self.store.get_object(&self.bucket, &self.key, None).await
    }

    /// The body as an SDK stream; nothing is buffered up front.
    pub async fn download_stream(&self) -> Result<ByteStream> {
        self.store.get_object_stream(&self.bucket, &self.key).await
    }

    pub async fn download_reader(&self) -> Result<impl AsyncBufRead> {
        Ok(self.download_stream().await?.into_async_read())
    }

    /// Streams the body into a local file and returns the bytes written.
    pub async fn download_file(&self, path: impl AsRef<Path>) -> Result<u64> {
        let reader = self.download_reader().await?;
        tokio::pin!(reader);
        let mut file = tokio::fs::File::create(path.as_ref()).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        debug!(bucket = %self.bucket, key = %self.key, written, "downloaded object to file");
        Ok(written)
    }

    pub async fn upload_bytes(&self, data: impl Into<Bytes>, acl: Option<&str>) -> Result<Self> {
        self.store
            .put_object(&self.bucket, &self.key, data.into(), acl)
            .await?;
        self.refresh().await
    }

    pub async fn upload_stream(&self, body: ByteStream, acl: Option<&str>) -> Result<Self> {
        self.store
            .put_object_stream(&self.bucket, &self.key, body, acl)
            .await?;
        self.refresh().await
    }

    pub async fn upload_file(&self, path: impl AsRef<Path>, acl: Option<&str>) -> Result<Self> {
        let body = ByteStream::from_path(path.as_ref())
            .await
            .map_err(std::io::Error::other)?;
        self.upload_stream(body, acl).await
    }
}

/// `(".Ext", ".ext")` from the text after the last period, or empty strings.
fn file_extension(key: &str) -> (String, String) {
    match key.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = format!(".{extension}");
            let file_type = extension.to_lowercase();
            (extension, file_type)
        }
        None => (String::new(), String::new()),
    }
}

impl fmt::Debug for S3Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Object")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("exists", &self.exists)
            .field("etag", &self.etag)
            .field("size", &self.size)
            .field("storage_class", &self.storage_class)
            .field("last_modified", &self.last_modified)
            .field("event_name", &self.event_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for S3Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
