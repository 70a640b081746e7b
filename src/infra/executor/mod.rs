//! 容器运行时执行器
//!
//! 编排器只依赖 [`RuntimeExecutor`] 这个契约；生产环境使用
//! [`DockerComposeExecutor`]，测试使用确定性的 [`MockExecutor`]。

mod docker;
mod mock;

pub use docker::{discover_docker_host, DockerComposeExecutor, DockerExecutorConfig};
pub use mock::{ExecutorCall, MockExecutor};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::infra::command::CommandError;

/// 执行器错误
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// 命令执行失败（非零退出），附带命令输出
    #[error("{operation} failed: {output}")]
    Failed {
        operation: &'static str,
        output: String,
    },

    /// 命令未能正常运行（启动失败、超时、取消）
    #[error("{operation} failed: {source}")]
    Command {
        operation: &'static str,
        #[source]
        source: CommandError,
    },
}

impl ExecutorError {
    pub fn failed(operation: &'static str, output: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            output: output.into(),
        }
    }
}

/// 执行器操作的目标 compose 项目
///
/// 项目名即部署 ID，目录由路径解析得到，不接受外部输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    pub name: String,
    pub dir: PathBuf,
    pub manifest: PathBuf,
}

impl ComposeProject {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, manifest: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            manifest: manifest.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// 容器运行时能力集合
#[async_trait]
pub trait RuntimeExecutor: Send + Sync {
    /// 按已持久化的清单启动项目
    async fn up(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError>;

    /// 停止并移除项目容器
    async fn down(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError>;

    /// 重启项目容器
    async fn restart(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError>;

    /// 获取原始状态输出（JSON 数组或逐行 JSON），由状态归一化模块解析
    async fn status(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<String, ExecutorError>;

    /// 在指定容器内重新加载进程（nginx -s reload），返回命令输出
    async fn reload_process(&self, container: &str, cancel: &CancellationToken) -> Result<String, ExecutorError>;

    /// 签发证书
    async fn issue_certificate(&self, domain: &str, cancel: &CancellationToken) -> Result<(), ExecutorError>;
}
