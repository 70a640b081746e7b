//! 应用状态

use chrono::{DateTime, Utc};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

use crate::config::EnvConfig;
use crate::domain::IdentityPolicy;
use crate::infra::RuntimeExecutor;
use crate::services::{DeploymentStore, LifecycleService};

/// 全局 shutdown token，用于优雅关闭
static GLOBAL_SHUTDOWN: OnceLock<CancellationToken> = OnceLock::new();

/// 获取全局 shutdown token
pub fn get_shutdown_token() -> CancellationToken {
    GLOBAL_SHUTDOWN.get_or_init(CancellationToken::new).clone()
}

/// 触发全局 shutdown
pub fn trigger_shutdown() {
    if let Some(token) = GLOBAL_SHUTDOWN.get() {
        token.cancel();
    }
}

/// 应用状态
pub struct AppState {
    /// API 密钥（None 表示不校验）
    pub api_key: Option<String>,
    /// 环境配置
    pub config: EnvConfig,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
    /// 生命周期服务
    pub lifecycle: LifecycleService,
}

impl AppState {
    /// 根据配置和执行器创建应用状态
    pub fn new(config: EnvConfig, executor: Arc<dyn RuntimeExecutor>) -> Self {
        let lifecycle = LifecycleService::new(
            IdentityPolicy::new(config.max_id_length),
            DeploymentStore::new(config.deployments_dir.clone()),
            executor,
            config.start_failure_policy,
        );

        tracing::info!(
            port = config.port,
            deployments_dir = %config.deployments_dir.display(),
            auth_enabled = config.api_key.is_some(),
            start_failure_policy = config.start_failure_policy.name(),
            command_timeout_secs = config.command_timeout.as_secs(),
            max_id_length = config.max_id_length,
            "Loaded configuration"
        );
        if config.api_key.is_none() {
            tracing::warn!("DOCKER_CONTROL_API_KEY not set, API authentication disabled");
        }

        Self {
            api_key: config.api_key.clone(),
            started_at: Utc::now(),
            lifecycle,
            config,
        }
    }

    /// 派生一个请求级取消令牌：服务关闭时一并取消
    pub fn request_token(&self) -> CancellationToken {
        get_shutdown_token().child_token()
    }
}
