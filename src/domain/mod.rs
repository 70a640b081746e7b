//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod container;
pub mod deployment;
pub mod identity;

// Re-exports for convenience
pub use container::ContainerStatus;
pub use deployment::{ActionResult, AppStatus, DeploymentState, ErrorCode};
pub use identity::{DeploymentId, IdentityError, IdentityPolicy};
