//! 运行时状态模块
//!
//! 管理应用状态和按部署的互斥锁

pub mod app_state;
pub mod deploy_locks;

pub use app_state::AppState;
pub use deploy_locks::DeploymentLocks;
