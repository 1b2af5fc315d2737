//! In-memory `ObjectStore` shared by the unit tests of this crate.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use awsutils_common::{
    error::{AwsUtilsError, Result},
    types::{ByteRange, ObjectInfo},
};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, TimeZone, Utc};
use md5::{Digest, Md5};

use crate::traits::{CompletedPart, CopySource, ListObjectsPage, ListObjectsRequest, ObjectStore};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoredBucket {
    region: String,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug)]
struct Upload {
    bucket: String,
    key: String,
    parts: BTreeMap<i32, (String, Bytes)>,
}

#[derive(Debug)]
struct State {
    buckets: BTreeMap<String, StoredBucket>,
    uploads: HashMap<String, Upload>,
    calls: Vec<(String, &'static str)>,
    /// (operation, key, canned ACL) for every call that takes one
    acls: Vec<(&'static str, String, Option<String>)>,
    /// operation -> number of calls that still succeed before failing
    failures: HashMap<&'static str, usize>,
    next_upload: u64,
    page_size: usize,
    clock: DateTime<Utc>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
            uploads: HashMap::new(),
            calls: Vec::new(),
            acls: Vec::new(),
            failures: HashMap::new(),
            next_upload: 0,
            page_size: DEFAULT_PAGE_SIZE,
            clock: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}

/// A fake object store; every region view shares the same buckets.
#[derive(Debug, Clone)]
pub(crate) struct MemoryObjectStore {
    region: String,
    state: Arc<Mutex<State>>,
}

impl MemoryObjectStore {
    pub(crate) fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub(crate) fn shared(&self) -> Arc<dyn ObjectStore> {
        Arc::new(self.clone())
    }

    pub(crate) fn add_bucket(&self, bucket: &str, region: &str) {
        self.state.lock().unwrap().buckets.insert(
            bucket.to_string(),
            StoredBucket {
                region: region.to_string(),
                objects: BTreeMap::new(),
            },
        );
    }

    pub(crate) fn put(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let mut state = self.state.lock().unwrap();
        let last_modified = state.tick();
        insert_object(&mut state, bucket, key, data.into(), last_modified);
    }

    pub(crate) fn put_at(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) {
        let mut state = self.state.lock().unwrap();
        insert_object(&mut state, bucket, key, data.into(), last_modified);
    }

    pub(crate) fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.state.lock().unwrap();
        state
            .buckets
            .get(bucket)
            .and_then(|stored| stored.objects.get(key))
            .map(|object| object.data.clone())
    }

    pub(crate) fn set_page_size(&self, page_size: usize) {
        self.state.lock().unwrap().page_size = page_size;
    }

    /// Lets `succeed` calls of `operation` through, then fails every later one.
    pub(crate) fn fail_operation(&self, operation: &'static str, succeed: usize) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, succeed);
    }

    pub(crate) fn calls(&self) -> Vec<(String, &'static str)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, op)| *op == operation)
            .count()
    }

    /// ACLs passed to `operation`, in call order.
    pub(crate) fn acls(&self, operation: &str) -> Vec<Option<String>> {
        self.state
            .lock()
            .unwrap()
            .acls
            .iter()
            .filter(|(op, _, _)| *op == operation)
            .map(|(_, _, acl)| acl.clone())
            .collect()
    }

    pub(crate) fn open_uploads(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    fn record(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((self.region.clone(), operation));
        if let Some(remaining) = state.failures.get_mut(operation) {
            if *remaining == 0 {
                return Err(remote(operation, 500, "InternalError"));
            }
            *remaining -= 1;
        }
        Ok(state)
    }

    fn record_acl(
        &self,
        operation: &'static str,
        key: &str,
        acl: Option<&str>,
    ) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.record(operation)?;
        state
            .acls
            .push((operation, key.to_string(), acl.map(str::to_string)));
        Ok(state)
    }

    fn check_region(&self, state: &State, operation: &'static str, bucket: &str) -> Result<()> {
        match state.buckets.get(bucket) {
            None => Err(remote(operation, 404, "NoSuchBucket")),
            Some(stored) if stored.region != self.region => {
                Err(remote(operation, 301, "PermanentRedirect"))
            }
            Some(_) => Ok(()),
        }
    }
}

impl State {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += chrono::Duration::seconds(1);
        self.clock
    }

    fn source(&self, operation: &'static str, source: CopySource<'_>) -> Result<StoredObject> {
        self.buckets
            .get(source.bucket)
            .ok_or_else(|| remote(operation, 404, "NoSuchBucket"))?
            .objects
            .get(source.key)
            .cloned()
            .ok_or_else(|| remote(operation, 404, "NoSuchKey"))
    }
}

fn insert_object(
    state: &mut State,
    bucket: &str,
    key: &str,
    data: Bytes,
    last_modified: DateTime<Utc>,
) -> String {
    let etag = content_etag(&data);
    state
        .buckets
        .entry(bucket.to_string())
        .or_default()
        .objects
        .insert(
            key.to_string(),
            StoredObject {
                data,
                etag: etag.clone(),
                last_modified,
            },
        );
    etag
}

fn content_etag(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

fn remote(operation: &'static str, status: u16, code: &str) -> AwsUtilsError {
    AwsUtilsError::RemoteCall {
        service: "s3",
        operation,
        status,
        code: code.to_string(),
        message: format!("fake {operation} failure"),
    }
}

fn slice(operation: &'static str, data: &Bytes, range: ByteRange) -> Result<Bytes> {
    if range.start > range.end || range.end >= data.len() as u64 {
        return Err(remote(operation, 416, "InvalidRange"));
    }
    Ok(data.slice(range.start as usize..=range.end as usize))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn region(&self) -> &str {
        &self.region
    }

    fn with_region(&self, region: &str) -> Arc<dyn ObjectStore> {
        Arc::new(Self {
            region: region.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.record("CreateBucket")?;
        match state.buckets.get(bucket) {
            Some(stored) if stored.region == self.region => Ok(()),
            Some(_) => Err(remote("CreateBucket", 409, "BucketAlreadyExists")),
            None => {
                state.buckets.insert(
                    bucket.to_string(),
                    StoredBucket {
                        region: self.region.clone(),
                        objects: BTreeMap::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn bucket_region(&self, bucket: &str) -> Result<String> {
        let state = self.record("HeadBucket")?;
        state
            .buckets
            .get(bucket)
            .map(|stored| stored.region.clone())
            .ok_or_else(|| remote("HeadBucket", 404, "NoSuchBucket"))
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage> {
        let state = self.record("ListObjectsV2")?;
        self.check_region(&state, "ListObjectsV2", &request.bucket)?;

        let limit = request
            .max_keys
            .map(|max| max.max(0) as usize)
            .unwrap_or(state.page_size)
            .min(state.page_size);
        let mut matching = state.buckets[&request.bucket]
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(&request.prefix))
            .filter(|(key, _)| key.as_str() > request.start_after.as_str());

        let objects = matching
            .by_ref()
            .take(limit)
            .map(|(key, object)| ObjectInfo {
                bucket: request.bucket.clone(),
                key: key.clone(),
                size: object.data.len() as u64,
                etag: object.etag.clone(),
                storage_class: "STANDARD".to_string(),
                last_modified: object.last_modified,
            })
            .collect::<Vec<_>>();
        let is_truncated = matching.next().is_some();

        Ok(ListObjectsPage {
            key_count: objects.len() as i32,
            objects,
            is_truncated,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let state = self.record("HeadObject")?;
        self.check_region(&state, "HeadObject", bucket)?;
        let object = state.buckets[bucket]
            .objects
            .get(key)
            .ok_or_else(|| AwsUtilsError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(ObjectInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: object.data.len() as u64,
            etag: object.etag.clone(),
            storage_class: "STANDARD".to_string(),
            last_modified: object.last_modified,
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<Bytes> {
        let state = self.record("GetObject")?;
        self.check_region(&state, "GetObject", bucket)?;
        let object = state.source("GetObject", CopySource { bucket, key })?;
        match range {
            Some(range) => slice("GetObject", &object.data, range),
            None => Ok(object.data),
        }
    }

    async fn get_object_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let data = self.get_object(bucket, key, None).await?;
        Ok(ByteStream::from(data))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        acl: Option<&str>,
    ) -> Result<String> {
        let mut state = self.record_acl("PutObject", key, acl)?;
        self.check_region(&state, "PutObject", bucket)?;
        let last_modified = state.tick();
        Ok(insert_object(&mut state, bucket, key, data, last_modified))
    }

    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        acl: Option<&str>,
    ) -> Result<String> {
        let data = body
            .collect()
            .await
            .map_err(|err| AwsUtilsError::Transport {
                service: "s3",
                operation: "PutObject",
                message: err.to_string(),
            })?
            .into_bytes();
        self.put_object(bucket, key, data, acl).await
    }

    async fn copy_object(
        &self,
        source: CopySource<'_>,
        bucket: &str,
        key: &str,
        acl: Option<&str>,
    ) -> Result<String> {
        let mut state = self.record_acl("CopyObject", key, acl)?;
        self.check_region(&state, "CopyObject", bucket)?;
        let object = state.source("CopyObject", source)?;
        let last_modified = state.tick();
        Ok(insert_object(
            &mut state,
            bucket,
            key,
            object.data,
            last_modified,
        ))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut state = self.record("DeleteObject")?;
        self.check_region(&state, "DeleteObject", bucket)?;
        if let Some(stored) = state.buckets.get_mut(bucket) {
            stored.objects.remove(key);
        }
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        acl: Option<&str>,
    ) -> Result<String> {
        let mut state = self.record_acl("CreateMultipartUpload", key, acl)?;
        self.check_region(&state, "CreateMultipartUpload", bucket)?;
        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(
            upload_id.clone(),
            Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<String> {
        let mut state = self.record("UploadPart")?;
        self.check_region(&state, "UploadPart", bucket)?;
        let etag = content_etag(&data);
        let upload = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| remote("UploadPart", 404, "NoSuchUpload"))?;
        upload.parts.insert(part_number, (etag.clone(), data));
        Ok(etag)
    }

    async fn upload_part_copy(
        &self,
        bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        source: CopySource<'_>,
        range: ByteRange,
    ) -> Result<String> {
        let mut state = self.record("UploadPartCopy")?;
        self.check_region(&state, "UploadPartCopy", bucket)?;
        self.check_region(&state, "UploadPartCopy", source.bucket)?;
        let object = state.source("UploadPartCopy", source)?;
        let data = slice("UploadPartCopy", &object.data, range)?;
        let etag = content_etag(&data);
        let upload = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| remote("UploadPartCopy", 404, "NoSuchUpload"))?;
        upload.parts.insert(part_number, (etag.clone(), data));
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<String> {
        const OPERATION: &str = "CompleteMultipartUpload";
        let mut state = self.record(OPERATION)?;
        self.check_region(&state, OPERATION, bucket)?;
        let upload = state
            .uploads
            .get(upload_id)
            .ok_or_else(|| remote(OPERATION, 404, "NoSuchUpload"))?;
        if upload.bucket != bucket || upload.key != key || parts.is_empty() {
            return Err(remote(OPERATION, 400, "InvalidRequest"));
        }
        if parts
            .windows(2)
            .any(|pair| pair[0].part_number >= pair[1].part_number)
        {
            return Err(remote(OPERATION, 400, "InvalidPartOrder"));
        }

        let mut data = BytesMut::new();
        for part in parts {
            match upload.parts.get(&part.part_number) {
                Some((etag, bytes)) if *etag == part.etag => data.extend_from_slice(bytes),
                _ => return Err(remote(OPERATION, 400, "InvalidPart")),
            }
        }

        state.uploads.remove(upload_id);
        let last_modified = state.tick();
        let etag = insert_object(&mut state, bucket, key, data.freeze(), last_modified);
        Ok(format!("{etag}-{}", parts.len()))
    }

    async fn abort_multipart_upload(&self, bucket: &str, _key: &str, upload_id: &str) -> Result<()> {
        let mut state = self.record("AbortMultipartUpload")?;
        self.check_region(&state, "AbortMultipartUpload", bucket)?;
        state
            .uploads
            .remove(upload_id)
            .map(|_| ())
            .ok_or_else(|| remote("AbortMultipartUpload", 404, "NoSuchUpload"))
    }
}
