//! Launching Fargate tasks through the ECS `RunTask` API.

pub mod client;
pub mod task;
pub mod types;

pub use client::{EcsClient, TaskApi};
pub use task::{EcsTask, NetworkConfiguration};
pub use types::{RunTaskInput, RunTaskOutput};
