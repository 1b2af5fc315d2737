//! Folding SDK call failures into `AwsUtilsError`.

use aws_smithy_types::error::display::DisplayErrorContext;
use awsutils_common::error::AwsUtilsError;

/// What a failed SDK call reported, extracted by each service client.
#[derive(Debug, Default)]
pub struct CallFailure<'a> {
    /// HTTP status, when a response came back at all.
    pub status: Option<u16>,
    pub code: Option<&'a str>,
    pub message: Option<&'a str>,
    /// Rendered error chain; used when the service sent no message.
    pub detail: String,
}

impl CallFailure<'_> {
    pub fn describe<E: std::error::Error>(err: &E) -> String {
        DisplayErrorContext(err).to_string()
    }
}

/// A response without an error code is keyed by its status; no response at
/// all is a transport failure.
pub fn remote_error(
    service: &'static str,
    operation: &'static str,
    failure: CallFailure<'_>,
) -> AwsUtilsError {
    let message = failure
        .message
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or(failure.detail);

    match (failure.code, failure.status) {
        (Some(code), status) => AwsUtilsError::RemoteCall {
            service,
            operation,
            status: status.unwrap_or_default(),
            code: code.to_string(),
            message,
        },
        (None, Some(status)) => AwsUtilsError::RemoteCall {
            service,
            operation,
            status,
            code: status_code(status),
            message,
        },
        (None, None) => AwsUtilsError::Transport {
            service,
            operation,
            message,
        },
    }
}

fn status_code(status: u16) -> String {
    match status {
        301 => "PermanentRedirect".to_string(),
        403 => "Forbidden".to_string(),
        404 => "NotFound".to_string(),
        status => format!("Http{status}"),
    }
}

#[cfg(test)]
mod tests {
    use awsutils_common::AwsUtilsError;

    use super::{CallFailure, remote_error};

    #[test]
    fn service_code_wins_over_status() {
        let err = remote_error(
            "s3",
            "DeleteObject",
            CallFailure {
                status: Some(403),
                code: Some("AccessDenied"),
                message: Some("denied"),
                detail: "service error".to_string(),
            },
        );
        assert_eq!(err.remote_code(), Some("AccessDenied"));
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn bodyless_404_reads_as_not_found() {
        let err = remote_error(
            "s3",
            "HeadObject",
            CallFailure {
                status: Some(404),
                detail: "unhandled error".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(err.remote_code(), Some("NotFound"));
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_response_is_a_transport_failure() {
        let err = remote_error(
            "ssm",
            "GetParameters",
            CallFailure {
                detail: "dispatch failure: connection refused".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(err, AwsUtilsError::Transport { .. }));
        assert!(err.is_remote());
        assert!(err.to_string().contains("connection refused"));
    }
}
