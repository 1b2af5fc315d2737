//! Credentials, region resolution and the shared SDK configuration every
//! service client is built from.

pub mod remote;
pub mod session;

pub use aws_credential_types::Credentials;
pub use remote::{CallFailure, remote_error};
pub use session::{DEFAULT_REGION, Session, SessionConfig};
