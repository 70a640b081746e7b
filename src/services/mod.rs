//! 服务层模块
//!
//! 包含核心业务逻辑

pub mod lifecycle;
pub mod status;
pub mod storage;

pub use lifecycle::{LifecycleService, StartFailurePolicy};
pub use storage::{DeploymentPaths, DeploymentStore};
