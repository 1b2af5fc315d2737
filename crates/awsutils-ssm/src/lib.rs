//! Decrypted, prefix-scoped reads from the SSM parameter store.

pub mod client;
pub mod store;
pub mod types;

pub use client::{ParameterApi, SsmClient};
pub use store::{MAX_BATCH, ParameterStore};
pub use types::Parameter;
