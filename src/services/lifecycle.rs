//! 部署生命周期编排
//!
//! 五个主操作（start / stop / restart / update / status）和两个辅助操作
//! （reload / 证书签发）。每个操作：
//! 1. 先校验 ID，非法 ID 直接返回 `INVALID_UUID`，不触碰存储和执行器
//! 2. 解析存储路径，持有该 ID 的锁直到操作结束
//! 3. 所有预期内的失败都以 [`ActionResult`] / [`AppStatus`] 返回

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::identity::{is_valid_container_name, is_valid_domain};
use crate::domain::{
    ActionResult, AppStatus, DeploymentId, DeploymentState, ErrorCode, IdentityPolicy,
};
use crate::infra::RuntimeExecutor;
use crate::state::DeploymentLocks;

use super::status::normalize;
use super::storage::{DeploymentPaths, DeploymentStore};

/// Start 中 up 失败后的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartFailurePolicy {
    /// 保留清单，便于重试
    #[default]
    Keep,
    /// 补偿执行一次 down（尽力而为，失败只记日志）
    Cleanup,
}

impl StartFailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "cleanup" => Some(Self::Cleanup),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Cleanup => "cleanup",
        }
    }
}

/// 生命周期服务
pub struct LifecycleService {
    policy: IdentityPolicy,
    store: DeploymentStore,
    executor: Arc<dyn RuntimeExecutor>,
    locks: DeploymentLocks,
    start_failure: StartFailurePolicy,
}

impl LifecycleService {
    pub fn new(
        policy: IdentityPolicy,
        store: DeploymentStore,
        executor: Arc<dyn RuntimeExecutor>,
        start_failure: StartFailurePolicy,
    ) -> Self {
        Self {
            policy,
            store,
            executor,
            locks: DeploymentLocks::new(),
            start_failure,
        }
    }

    pub fn store(&self) -> &DeploymentStore {
        &self.store
    }

    /// 当前有操作在执行或等待的部署数量
    pub async fn active_operations(&self) -> usize {
        self.locks.active_count().await
    }

    fn validate(&self, raw: &str) -> Result<DeploymentId, ActionResult> {
        self.policy.validate(raw).map_err(|e| {
            warn!(uuid = %raw, error = %e, "Rejected deployment id");
            ActionResult::fail(ErrorCode::InvalidUuid, e.to_string())
        })
    }

    async fn require_existing(&self, paths: &DeploymentPaths) -> Result<(), ActionResult> {
        if self.store.exists(paths).await {
            Ok(())
        } else {
            Err(ActionResult::fail(
                ErrorCode::DeploymentNotFound,
                "Deployment not found",
            ))
        }
    }

    /// 持久化清单并启动
    pub async fn start(
        &self,
        raw_id: &str,
        manifest: &str,
        cancel: &CancellationToken,
    ) -> ActionResult {
        let id = match self.validate(raw_id) {
            Ok(id) => id,
            Err(result) => return result,
        };
        if manifest.trim().is_empty() {
            return ActionResult::fail(ErrorCode::InvalidComposeYaml, "Compose YAML is required");
        }

        info!(uuid = %id, "Starting compose");

        let paths = self.store.resolve(&id);
        let _guard = self.locks.acquire(&id).await;

        if let Err(e) = self.store.create_dir(&paths).await {
            error!(uuid = %id, error = %e, "Failed to create deployment directory");
            return ActionResult::fail(
                ErrorCode::DirectoryCreateFailed,
                "Failed to create deployment directory",
            );
        }

        if let Err(e) = self.store.write_manifest(&paths, manifest).await {
            error!(uuid = %id, error = %e, "Failed to write compose file");
            return ActionResult::fail(ErrorCode::FileWriteFailed, "Failed to write compose file");
        }

        let project = paths.project();
        if let Err(e) = self.executor.up(&project, cancel).await {
            error!(uuid = %id, error = %e, "Failed to start compose");

            if self.start_failure == StartFailurePolicy::Cleanup {
                // 补偿 down 不受请求取消影响，否则一个被放弃的请求会留下半启动的项目
                let cleanup = CancellationToken::new();
                match self.executor.down(&project, &cleanup).await {
                    Ok(()) => info!(uuid = %id, "Cleaned up after failed start"),
                    Err(down_err) => {
                        warn!(uuid = %id, error = %down_err, "Cleanup after failed start also failed")
                    }
                }
            }

            return ActionResult::fail(
                ErrorCode::ComposeUpFailed,
                format!("Failed to start compose: {}", e),
            );
        }

        info!(uuid = %id, "Successfully started compose");
        ActionResult::ok("Compose started successfully")
    }

    /// 停止部署（只要求记录存在，不要求有容器在运行；记录保留）
    pub async fn stop(&self, raw_id: &str, cancel: &CancellationToken) -> ActionResult {
        let id = match self.validate(raw_id) {
            Ok(id) => id,
            Err(result) => return result,
        };

        info!(uuid = %id, "Stopping app");

        let paths = self.store.resolve(&id);
        let _guard = self.locks.acquire(&id).await;

        if let Err(result) = self.require_existing(&paths).await {
            return result;
        }

        if let Err(e) = self.executor.down(&paths.project(), cancel).await {
            error!(uuid = %id, error = %e, "Failed to stop app");
            return ActionResult::fail(
                ErrorCode::ComposeDownFailed,
                format!("Failed to stop app: {}", e),
            );
        }

        info!(uuid = %id, "Successfully stopped app");
        ActionResult::ok("App stopped successfully")
    }

    /// 重启部署，ID 和清单不变
    pub async fn restart(&self, raw_id: &str, cancel: &CancellationToken) -> ActionResult {
        let id = match self.validate(raw_id) {
            Ok(id) => id,
            Err(result) => return result,
        };

        info!(uuid = %id, "Restarting app");

        let paths = self.store.resolve(&id);
        let _guard = self.locks.acquire(&id).await;

        if let Err(result) = self.require_existing(&paths).await {
            return result;
        }

        if let Err(e) = self.executor.restart(&paths.project(), cancel).await {
            error!(uuid = %id, error = %e, "Failed to restart app");
            return ActionResult::fail(
                ErrorCode::ComposeRestartFailed,
                format!("Failed to restart app: {}", e),
            );
        }

        info!(uuid = %id, "Successfully restarted app");
        ActionResult::ok("App restarted successfully")
    }

    /// 替换清单后 down + up
    ///
    /// 非原子：down 成功而 up 失败时，部署停在 Stopped，新清单已落盘，可直接重试
    pub async fn update(
        &self,
        raw_id: &str,
        manifest: &str,
        cancel: &CancellationToken,
    ) -> ActionResult {
        let id = match self.validate(raw_id) {
            Ok(id) => id,
            Err(result) => return result,
        };
        if manifest.trim().is_empty() {
            return ActionResult::fail(ErrorCode::InvalidComposeYaml, "Compose YAML is required");
        }

        info!(uuid = %id, "Updating compose");

        let paths = self.store.resolve(&id);
        let _guard = self.locks.acquire(&id).await;

        if let Err(result) = self.require_existing(&paths).await {
            return result;
        }

        if let Err(e) = self.store.write_manifest(&paths, manifest).await {
            error!(uuid = %id, error = %e, "Failed to update compose file");
            return ActionResult::fail(ErrorCode::FileWriteFailed, "Failed to update compose file");
        }

        let project = paths.project();
        if let Err(e) = self.executor.down(&project, cancel).await {
            error!(uuid = %id, error = %e, "Failed to stop app during update");
            return ActionResult::fail(
                ErrorCode::ComposeDownFailed,
                format!("Failed to stop app during update: {}", e),
            );
        }

        if let Err(e) = self.executor.up(&project, cancel).await {
            error!(uuid = %id, error = %e, "Failed to start app after update");
            return ActionResult::fail(
                ErrorCode::ComposeUpFailed,
                format!("Failed to start app after update: {}", e),
            );
        }

        info!(uuid = %id, "Successfully updated compose");
        ActionResult::ok("Compose updated successfully")
    }

    /// 查询部署状态
    pub async fn status(&self, raw_id: &str, cancel: &CancellationToken) -> AppStatus {
        let id = match self.policy.validate(raw_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(uuid = %raw_id, error = %e, "Rejected deployment id");
                return AppStatus::new(raw_id, DeploymentState::Error, e.to_string());
            }
        };

        info!(uuid = %id, "Getting status");

        let paths = self.store.resolve(&id);
        let _guard = self.locks.acquire(&id).await;

        if !self.store.exists(&paths).await {
            return AppStatus::new(id.as_str(), DeploymentState::Unknown, "Deployment not found");
        }

        let raw = match self.executor.status(&paths.project(), cancel).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(uuid = %id, error = %e, "Failed to get status");
                return AppStatus::new(
                    id.as_str(),
                    DeploymentState::Error,
                    format!("Failed to get status: {}", e),
                );
            }
        };

        let containers = normalize(&raw);
        AppStatus {
            id: id.to_string(),
            state: DeploymentState::from_containers(&containers),
            containers,
            message: "Status retrieved successfully".to_string(),
        }
    }

    /// 在容器内 reload 进程（nginx）
    pub async fn reload_process(&self, container: &str, cancel: &CancellationToken) -> ActionResult {
        if container.is_empty() {
            return ActionResult::fail(ErrorCode::InvalidContainerName, "container_name is required");
        }
        if !is_valid_container_name(container) {
            return ActionResult::fail(ErrorCode::InvalidContainerName, "Invalid container name");
        }

        info!(container = %container, "Reloading process");

        match self.executor.reload_process(container, cancel).await {
            Ok(output) => {
                let result = ActionResult::ok("Process reloaded successfully");
                if output.trim().is_empty() {
                    result
                } else {
                    result.with_details(output.trim())
                }
            }
            Err(e) => {
                error!(container = %container, error = %e, "Failed to reload process");
                ActionResult::fail(ErrorCode::ReloadFailed, "Failed to reload process")
                    .with_details(e.to_string())
            }
        }
    }

    /// 签发证书
    pub async fn issue_certificate(&self, domain: &str, cancel: &CancellationToken) -> ActionResult {
        if domain.is_empty() {
            return ActionResult::fail(ErrorCode::InvalidDomain, "domain is required");
        }
        if !is_valid_domain(domain) {
            return ActionResult::fail(ErrorCode::InvalidDomain, "Invalid domain");
        }

        info!(domain = %domain, "Issuing certificate");

        if let Err(e) = self.executor.issue_certificate(domain, cancel).await {
            error!(domain = %domain, error = %e, "Failed to issue certificate");
            return ActionResult::fail(ErrorCode::CertificateIssueFailed, "Failed to issue certificate")
                .with_details(e.to_string());
        }

        info!(domain = %domain, "Successfully issued certificate");
        ActionResult::ok("Certificate issued successfully")
            .with_details(format!("Certificate for {} is now available", domain))
    }
}
