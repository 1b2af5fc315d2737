use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::Builder as S3ConfigBuilder,
    error::{ProvideErrorMetadata, SdkError},
    primitives::{ByteStream, DateTime as SdkDateTime},
    types::{
        BucketLocationConstraint, CompletedMultipartUpload, CompletedPart as SdkCompletedPart,
        CreateBucketConfiguration, ObjectCannedAcl,
    },
};
use aws_smithy_types::checksum_config::{
    RequestChecksumCalculation, ResponseChecksumValidation,
};
use awsutils_auth::{
    remote::{CallFailure, remote_error},
    session::{DEFAULT_REGION, Session},
};
use awsutils_common::{
    error::{AwsUtilsError, Result},
    types::{ByteRange, ObjectInfo, strip_etag_quotes},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use crate::traits::{CompletedPart, CopySource, ListObjectsPage, ListObjectsRequest, ObjectStore};

const SERVICE: &str = "s3";
const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";
const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// Unreserved characters plus `/` stay literal in `x-amz-copy-source`.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `ObjectStore` over the AWS SDK S3 client. Path-style addressing is used
/// whenever the session carries an endpoint override.
#[derive(Debug, Clone)]
pub struct S3Client {
    session: Session,
    client: Client,
}

impl S3Client {
    pub fn new(session: Session) -> Self {
        let config = S3ConfigBuilder::from(session.sdk_config())
            .force_path_style(session.endpoint_url().is_some())
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();
        Self {
            client: Client::from_conf(config),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sdk_client(&self) -> &Client {
        &self.client
    }
}

fn sdk_error<E>(operation: &'static str, err: SdkError<E>) -> AwsUtilsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let service_error = err.as_service_error();
    let failure = CallFailure {
        status: err.raw_response().map(|response| response.status().as_u16()),
        code: service_error.and_then(|service_error| service_error.code()),
        message: service_error.and_then(|service_error| service_error.message()),
        detail: CallFailure::describe(&err),
    };
    remote_error(SERVICE, operation, failure)
}

fn invalid(message: String) -> AwsUtilsError {
    AwsUtilsError::InvalidResponse {
        service: SERVICE,
        message,
    }
}

fn not_found_for(err: AwsUtilsError, bucket: &str, key: &str) -> AwsUtilsError {
    if err.is_not_found() && err.remote_code() != Some("NoSuchBucket") {
        AwsUtilsError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        err
    }
}

fn copy_source_value(source: CopySource<'_>) -> String {
    utf8_percent_encode(&format!("{}/{}", source.bucket, source.key), COPY_SOURCE).to_string()
}

fn content_md5(data: &[u8]) -> String {
    BASE64_STANDARD.encode(Md5::digest(data))
}

fn canned_acl(acl: Option<&str>) -> Option<ObjectCannedAcl> {
    acl.filter(|value| !value.is_empty())
        .map(ObjectCannedAcl::from)
}

fn quoted_etag(etag: &str) -> String {
    format!("\"{}\"", strip_etag_quotes(etag))
}

fn required_etag(operation: &'static str, etag: Option<&str>) -> Result<String> {
    etag.map(strip_etag_quotes)
        .ok_or_else(|| invalid(format!("{operation}: missing ETag")))
}

fn timestamp(value: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|value| DateTime::from_timestamp(value.secs(), value.subsec_nanos()))
}

fn object_size(operation: &'static str, size: Option<i64>) -> Result<u64> {
    size.and_then(|size| u64::try_from(size).ok())
        .ok_or_else(|| invalid(format!("{operation}: missing or negative size")))
}

#[async_trait]
impl ObjectStore for S3Client {
    fn region(&self) -> &str {
        self.session.region()
    }

    fn with_region(&self, region: &str) -> Arc<dyn ObjectStore> {
        Arc::new(S3Client::new(self.session.for_region(region)))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region() != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) => match sdk_error("CreateBucket", err) {
                err if err.remote_code() == Some("BucketAlreadyOwnedByYou") => {
                    debug!(bucket, "bucket already owned by caller");
                    Ok(())
                }
                err => Err(err),
            },
        }
    }

    /// A redirect still names the bucket's region in `x-amz-bucket-region`.
    async fn bucket_region(&self, bucket: &str) -> Result<String> {
        let region = match self.client.head_bucket().bucket(bucket).send().await {
            Ok(output) => output.bucket_region().map(str::to_string),
            Err(err) => {
                let redirected = err
                    .raw_response()
                    .and_then(|response| response.headers().get(BUCKET_REGION_HEADER))
                    .map(str::to_string);
                match redirected {
                    Some(region) => Some(region),
                    None => return Err(sdk_error("HeadBucket", err)),
                }
            }
        };

        region
            .map(|region| region.trim().to_string())
            .filter(|region| !region.is_empty())
            .ok_or_else(|| invalid(format!("HeadBucket: missing {BUCKET_REGION_HEADER} for {bucket}")))
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<ListObjectsPage> {
        let mut call = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .fetch_owner(true)
            .set_max_keys(request.max_keys);
        if !request.start_after.is_empty() {
            call = call.start_after(&request.start_after);
        }
        let output = call
            .send()
            .await
            .map_err(|err| sdk_error("ListObjectsV2", err))?;

        let objects = output
            .contents()
            .iter()
            .map(|object| -> Result<ObjectInfo> {
                let key = object
                    .key()
                    .ok_or_else(|| invalid("ListObjectsV2: entry without a key".to_string()))?;
                let last_modified = timestamp(object.last_modified()).ok_or_else(|| {
                    invalid(format!("ListObjectsV2: missing LastModified for {key}"))
                })?;
                Ok(ObjectInfo {
                    bucket: request.bucket.clone(),
                    key: key.to_string(),
                    size: object_size("ListObjectsV2", object.size())?,
                    etag: object.e_tag().map(strip_etag_quotes).unwrap_or_default(),
                    storage_class: object
                        .storage_class()
                        .map(|class| class.as_str())
                        .unwrap_or(DEFAULT_STORAGE_CLASS)
                        .to_string(),
                    last_modified,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ListObjectsPage {
            key_count: output.key_count().unwrap_or(objects.len() as i32),
            is_truncated: output.is_truncated().unwrap_or(false),
            objects,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| not_found_for(sdk_error("HeadObject", err), bucket, key))?;

        Ok(ObjectInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: object_size("HeadObject", output.content_length())?,
            etag: output.e_tag().map(strip_etag_quotes).unwrap_or_default(),
            storage_class: output
                .storage_class()
                .map(|class| class.as_str())
                .unwrap_or(DEFAULT_STORAGE_CLASS)
                .to_string(),
            last_modified: timestamp(output.last_modified())
                .ok_or_else(|| invalid("HeadObject: missing Last-Modified".to_string()))?,
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_range(range.map(|range| range.header_value()))
            .send()
            .await
            .map_err(|err| not_found_for(sdk_error("GetObject", err), bucket, key))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|err| AwsUtilsError::Transport {
                service: SERVICE,
                operation: "GetObject",
                message: format!("failed to read body of {bucket}/{key}: {err}"),
            })?;
        Ok(body.into_bytes())
    }

    async fn get_object_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| not_found_for(sdk_error("GetObject", err), bucket, key))?;
        Ok(output.body)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        acl: Option<&str>,
    ) -> Result<String> {
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_acl(canned_acl(acl))
            .content_md5(content_md5(&data))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| sdk_error("PutObject", err))?;
        required_etag("PutObject", output.e_tag())
    }

    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        acl: Option<&str>,
    ) -> Result<String> {
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_acl(canned_acl(acl))
            .body(body)
            .send()
            .await
            .map_err(|err| sdk_error("PutObject", err))?;
        required_etag("PutObject", output.e_tag())
    }

    async fn copy_object(
        &self,
        source: CopySource<'_>,
        bucket: &str,
        key: &str,
        acl: Option<&str>,
    ) -> Result<String> {
        let output = self
            .client
            .copy_object()
            .copy_source(copy_source_value(source))
            .bucket(bucket)
            .key(key)
            .set_acl(canned_acl(acl))
            .send()
            .await
            .map_err(|err| sdk_error("CopyObject", err))?;
        required_etag(
            "CopyObject",
            output.copy_object_result().and_then(|result| result.e_tag()),
        )
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| sdk_error("DeleteObject", err))?;
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        acl: Option<&str>,
    ) -> Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_acl(canned_acl(acl))
            .send()
            .await
            .map_err(|err| sdk_error("CreateMultipartUpload", err))?;
        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| invalid("CreateMultipartUpload: missing UploadId".to_string()))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<String> {
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_md5(content_md5(&data))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| sdk_error("UploadPart", err))?;
        required_etag("UploadPart", output.e_tag())
    }

    async fn upload_part_copy(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        source: CopySource<'_>,
        range: ByteRange,
    ) -> Result<String> {
        let output = self
            .client
            .upload_part_copy()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .copy_source(copy_source_value(source))
            .copy_source_range(range.header_value())
            .send()
            .await
            .map_err(|err| sdk_error("UploadPartCopy", err))?;
        required_etag(
            "UploadPartCopy",
            output.copy_part_result().and_then(|result| result.e_tag()),
        )
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<String> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|part| {
                        SdkCompletedPart::builder()
                            .part_number(part.part_number)
                            .e_tag(quoted_etag(&part.etag))
                            .build()
                    })
                    .collect(),
            ))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|err| sdk_error("CompleteMultipartUpload", err))?;
        required_etag("CompleteMultipartUpload", output.e_tag())
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| sdk_error("AbortMultipartUpload", err))?;
        Ok(())
    }
}
