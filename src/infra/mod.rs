//! 基础设施模块
//!
//! 封装外部依赖（子进程执行、容器运行时）

pub mod command;
pub mod executor;

pub use command::{CommandRunner, CommandSpec};
pub use executor::{ComposeProject, DockerComposeExecutor, MockExecutor, RuntimeExecutor};
