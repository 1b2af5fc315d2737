use awsutils_common::error::{AwsUtilsError, Result};

pub const S3_SCHEME: &str = "s3";

/// Splits `scheme://bucket/key...` into bucket and key.
///
/// The key is everything after the first `/` following the bucket, so it may
/// itself contain `/`. Inputs with more than one `//` are rejected.
pub fn split_s3_url(url: &str) -> Result<(String, String)> {
    let tokens = url.split("//").collect::<Vec<_>>();
    if tokens.len() != 2 {
        return Err(AwsUtilsError::MalformedUrl(url.to_string()));
    }

    let (bucket, key) = tokens[1]
        .split_once('/')
        .ok_or_else(|| AwsUtilsError::MalformedUrl(url.to_string()))?;
    if bucket.is_empty() {
        return Err(AwsUtilsError::MalformedUrl(url.to_string()));
    }

    Ok((bucket.to_string(), key.to_string()))
}

pub fn format_s3_url(bucket: &str, key: &str) -> Result<String> {
    join_s3_url(bucket, key, "key")
}

pub(crate) fn join_s3_url(bucket: &str, path: &str, what: &'static str) -> Result<String> {
    if bucket.is_empty() || path.is_empty() {
        return Err(AwsUtilsError::IncompleteIdentifier(what));
    }
    Ok(format!("{S3_SCHEME}://{bucket}/{path}"))
}
