use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsUtilsError {
    #[error("invalid S3 URL {0:?}: must be of format s3://bucket-name/key-name")]
    MalformedUrl(String),
    #[error("invalid S3 URL: must specify both bucket and {0}")]
    IncompleteIdentifier(&'static str),
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("{service} {operation} failed with status {status}: {code}: {message}")]
    RemoteCall {
        service: &'static str,
        operation: &'static str,
        status: u16,
        code: String,
        message: String,
    },
    #[error("{service} {operation} request failed: {message}")]
    Transport {
        service: &'static str,
        operation: &'static str,
        message: String,
    },
    #[error("invalid response from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AwsUtilsError {
    /// Remote error code, when the failure came back from a remote API.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Self::RemoteCall { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::RemoteCall { status, code, .. } => {
                *status == 404 || matches!(code.as_str(), "NoSuchKey" | "NotFound")
            }
            _ => false,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteCall { .. } | Self::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, AwsUtilsError>;
