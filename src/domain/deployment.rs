//! 部署相关领域模型

use serde::{Deserialize, Serialize};

use super::container::ContainerStatus;

/// 返回给调用方的错误码
///
/// 前八个覆盖生命周期操作，其余用于 reload / 证书签发两个辅助操作
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUuid,
    InvalidComposeYaml,
    DirectoryCreateFailed,
    FileWriteFailed,
    ComposeUpFailed,
    ComposeDownFailed,
    ComposeRestartFailed,
    DeploymentNotFound,
    InvalidContainerName,
    ReloadFailed,
    InvalidDomain,
    CertificateIssueFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "INVALID_UUID",
            ErrorCode::InvalidComposeYaml => "INVALID_COMPOSE_YAML",
            ErrorCode::DirectoryCreateFailed => "DIRECTORY_CREATE_FAILED",
            ErrorCode::FileWriteFailed => "FILE_WRITE_FAILED",
            ErrorCode::ComposeUpFailed => "COMPOSE_UP_FAILED",
            ErrorCode::ComposeDownFailed => "COMPOSE_DOWN_FAILED",
            ErrorCode::ComposeRestartFailed => "COMPOSE_RESTART_FAILED",
            ErrorCode::DeploymentNotFound => "DEPLOYMENT_NOT_FOUND",
            ErrorCode::InvalidContainerName => "INVALID_CONTAINER_NAME",
            ErrorCode::ReloadFailed => "RELOAD_FAILED",
            ErrorCode::InvalidDomain => "INVALID_DOMAIN",
            ErrorCode::CertificateIssueFailed => "CERTIFICATE_ISSUE_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 操作结果
///
/// 预期内的失败（校验、未找到、IO、执行器）都通过这个结构返回，不走传输层错误
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    /// 附加信息（如执行器输出）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            details: None,
        }
    }

    pub fn fail(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code: Some(code),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 部署整体状态，由容器状态推导，不单独持久化
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    /// 没有找到部署记录
    Unknown,
    Stopped,
    Running,
    Error,
}

impl DeploymentState {
    /// 根据容器状态推导：任一容器 state 含 "running"（不区分大小写）即为 Running
    pub fn from_containers(containers: &[ContainerStatus]) -> Self {
        if containers.iter().any(ContainerStatus::is_running) {
            DeploymentState::Running
        } else {
            DeploymentState::Stopped
        }
    }
}

/// 部署状态查询结果
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppStatus {
    pub id: String,
    pub state: DeploymentState,
    pub containers: Vec<ContainerStatus>,
    pub message: String,
}

impl AppStatus {
    pub fn new(id: impl Into<String>, state: DeploymentState, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state,
            containers: Vec::new(),
            message: message.into(),
        }
    }
}

/// 创建 / 更新部署的请求体
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeRequest {
    /// compose 清单原文
    #[serde(default)]
    pub compose_yaml: String,
}

/// 证书签发请求体
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateRequest {
    #[serde(default)]
    pub domain: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(state: &str) -> ContainerStatus {
        ContainerStatus {
            name: "web".to_string(),
            state: state.to_string(),
            health: String::new(),
            ports: Vec::new(),
        }
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InvalidUuid).unwrap();
        assert_eq!(json, "\"INVALID_UUID\"");
        let json = serde_json::to_string(&ErrorCode::ComposeRestartFailed).unwrap();
        assert_eq!(json, "\"COMPOSE_RESTART_FAILED\"");
        assert_eq!(ErrorCode::DeploymentNotFound.as_str(), "DEPLOYMENT_NOT_FOUND");
    }

    #[test]
    fn test_action_result_skips_empty_fields() {
        let value = serde_json::to_value(ActionResult::ok("done")).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "message": "done" }));

        let value = serde_json::to_value(
            ActionResult::fail(ErrorCode::ReloadFailed, "Failed").with_details("boom"),
        )
        .unwrap();
        assert_eq!(value["error_code"], "RELOAD_FAILED");
        assert_eq!(value["details"], "boom");
    }

    #[test]
    fn test_state_from_containers() {
        assert_eq!(DeploymentState::from_containers(&[]), DeploymentState::Stopped);
        assert_eq!(
            DeploymentState::from_containers(&[container("exited"), container("Running")]),
            DeploymentState::Running
        );
        assert_eq!(
            DeploymentState::from_containers(&[container("exited"), container("created")]),
            DeploymentState::Stopped
        );
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(serde_json::to_string(&DeploymentState::Unknown).unwrap(), "\"UNKNOWN\"");
        assert_eq!(serde_json::to_string(&DeploymentState::Running).unwrap(), "\"RUNNING\"");
    }
}
