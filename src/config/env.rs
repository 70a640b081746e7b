//! 环境变量配置加载

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::domain::identity::DEFAULT_MAX_ID_LENGTH;
use crate::services::StartFailurePolicy;

/// 日志输出格式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 服务监听端口
    pub port: u16,
    /// 部署根目录（绝对路径）
    pub deployments_dir: PathBuf,
    /// 日志级别
    pub log_level: String,
    /// 日志格式
    pub log_format: LogFormat,
    /// API 密钥（未配置时不校验）
    pub api_key: Option<String>,
    /// Start 失败策略
    pub start_failure_policy: StartFailurePolicy,
    /// 单条命令超时
    pub command_timeout: Duration,
    /// 部署 ID 最大长度
    pub max_id_length: usize,
    /// certbot 联系邮箱
    pub certbot_email: Option<String>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源加载配置，缺失或非法的值使用默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());

        let port = var("DOCKER_CONTROL_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::DEFAULT_PORT);

        let deployments_dir = var("DOCKER_CONTROL_DEPLOYMENTS_DIR")
            .unwrap_or_else(|| constants::DEFAULT_DEPLOYMENTS_DIR.to_string());

        let log_level = var("DOCKER_CONTROL_LOG_LEVEL")
            .unwrap_or_else(|| constants::DEFAULT_LOG_LEVEL.to_string());

        let log_format = var("DOCKER_CONTROL_LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or(LogFormat::Json);

        let api_key = var("DOCKER_CONTROL_API_KEY");

        let start_failure_policy = match var("DOCKER_CONTROL_START_FAILURE_POLICY") {
            Some(v) => StartFailurePolicy::parse(&v).unwrap_or_else(|| {
                warn!(value = %v, "Unknown start failure policy, using 'keep'");
                StartFailurePolicy::Keep
            }),
            None => StartFailurePolicy::Keep,
        };

        let command_timeout = var("DOCKER_CONTROL_COMMAND_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(constants::DEFAULT_COMMAND_TIMEOUT_SECS));

        let max_id_length = var("DOCKER_CONTROL_MAX_ID_LENGTH")
            .and_then(|v| v.parse().ok())
            .filter(|len| *len > 0)
            .unwrap_or(DEFAULT_MAX_ID_LENGTH);

        let certbot_email = var("DOCKER_CONTROL_CERTBOT_EMAIL");

        Self {
            port,
            deployments_dir: absolute_path(Path::new(&deployments_dir)),
            log_level,
            log_format,
            api_key,
            start_failure_policy,
            command_timeout,
            max_id_length,
            certbot_email,
        }
    }

    /// 命令行参数覆盖环境变量
    pub fn apply_overrides(&mut self, overrides: &crate::RuntimeConfig) {
        if let Some(port) = overrides.port_override {
            self.port = port;
        }
        if let Some(dir) = &overrides.deployments_dir {
            self.deployments_dir = absolute_path(dir);
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
    }
}

/// 相对路径基于当前工作目录转为绝对路径，失败时原样返回
fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// 常量
pub mod constants {
    pub const DEFAULT_PORT: u16 = 50051;

    pub const DEFAULT_DEPLOYMENTS_DIR: &str = "./deployments";

    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// 单条 docker 命令超时（秒）
    pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_absolute_path() {
        assert_eq!(absolute_path(Path::new("/srv/deployments")), PathBuf::from("/srv/deployments"));

        let resolved = absolute_path(Path::new("./deployments"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("deployments"));
    }

    #[test]
    fn test_log_format() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Json);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EnvConfig::from_lookup(lookup(&[]));
        assert_eq!(config.port, constants::DEFAULT_PORT);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.api_key, None);
        assert_eq!(config.start_failure_policy, StartFailurePolicy::Keep);
        assert_eq!(config.max_id_length, DEFAULT_MAX_ID_LENGTH);
        assert_eq!(config.certbot_email, None);
        assert!(config.deployments_dir.is_absolute());
        assert!(config.deployments_dir.ends_with("deployments"));
    }

    #[test]
    fn test_from_lookup_and_overrides() {
        let mut config = EnvConfig::from_lookup(lookup(&[
            ("DOCKER_CONTROL_PORT", "6000"),
            ("DOCKER_CONTROL_LOG_FORMAT", "pretty"),
            ("DOCKER_CONTROL_START_FAILURE_POLICY", "cleanup"),
            ("DOCKER_CONTROL_COMMAND_TIMEOUT_SECS", "0"),
            ("DOCKER_CONTROL_MAX_ID_LENGTH", "64"),
            ("DOCKER_CONTROL_API_KEY", ""),
            ("DOCKER_CONTROL_CERTBOT_EMAIL", "ops@example.com"),
        ]));
        assert_eq!(config.port, 6000);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.start_failure_policy, StartFailurePolicy::Cleanup);
        assert_eq!(
            config.command_timeout,
            Duration::from_secs(constants::DEFAULT_COMMAND_TIMEOUT_SECS)
        );
        assert_eq!(config.max_id_length, 64);
        assert_eq!(config.api_key, None);
        assert_eq!(config.certbot_email.as_deref(), Some("ops@example.com"));

        config.apply_overrides(&crate::RuntimeConfig {
            port_override: Some(7000),
            deployments_dir: Some(PathBuf::from("/var/lib/docker-control")),
            log_level: Some("debug".to_string()),
        });
        assert_eq!(config.port, 7000);
        assert_eq!(config.deployments_dir, PathBuf::from("/var/lib/docker-control"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EnvConfig::from_lookup(lookup(&[
            ("DOCKER_CONTROL_PORT", "not-a-port"),
            ("DOCKER_CONTROL_START_FAILURE_POLICY", "retry"),
            ("DOCKER_CONTROL_MAX_ID_LENGTH", "0"),
        ]));
        assert_eq!(config.port, constants::DEFAULT_PORT);
        assert_eq!(config.start_failure_policy, StartFailurePolicy::Keep);
        assert_eq!(config.max_id_length, DEFAULT_MAX_ID_LENGTH);
    }
}
