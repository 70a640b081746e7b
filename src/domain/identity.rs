//! 部署标识校验
//!
//! 部署 ID 同时作为存储目录名使用，这里是防止路径穿越的唯一关口：
//! 所有操作在触碰文件系统或执行器之前都必须先拿到一个 [`DeploymentId`]。

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// 默认最大 ID 长度
pub const DEFAULT_MAX_ID_LENGTH: usize = 128;

/// 标识校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("UUID is required")]
    Empty,

    #[error("UUID must not contain path separators")]
    PathSeparator,

    #[error("UUID contains invalid characters")]
    InvalidCharacter,

    #[error("UUID exceeds maximum length of {0}")]
    TooLong(usize),
}

/// 标识校验策略
///
/// 启动时根据配置构造一次，之后只读，显式传给编排器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityPolicy {
    max_len: usize,
}

impl IdentityPolicy {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// 校验原始 ID
    ///
    /// 依次检查：空串、路径分隔符、字符集 `[A-Za-z0-9_-]`、长度
    pub fn validate(&self, raw: &str) -> Result<DeploymentId, IdentityError> {
        if raw.is_empty() {
            return Err(IdentityError::Empty);
        }
        if raw.contains(['/', '\\']) {
            return Err(IdentityError::PathSeparator);
        }
        if !raw.chars().all(is_id_char) {
            return Err(IdentityError::InvalidCharacter);
        }
        if raw.len() > self.max_len {
            return Err(IdentityError::TooLong(self.max_len));
        }
        Ok(DeploymentId(raw.to_string()))
    }
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ID_LENGTH)
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// 已校验的部署 ID
///
/// 只能通过 [`IdentityPolicy::validate`] 构造
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 校验容器名（Docker 规则：`[A-Za-z0-9][A-Za-z0-9_.-]*`）
pub fn is_valid_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// 校验域名（用于证书签发）
///
/// 每个 label 1-63 字符，字母数字开头结尾，中间允许 `-`；至少两个 label，总长不超过 253
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        let bytes = label.as_bytes();
        !bytes.is_empty()
            && bytes.len() <= 63
            && bytes[0].is_ascii_alphanumeric()
            && bytes[bytes.len() - 1].is_ascii_alphanumeric()
            && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_allowed_charset() {
        let policy = IdentityPolicy::default();
        for raw in ["abc123", "test-uuid", "A_b-C", "0", "550e8400-e29b-41d4-a716-446655440000"] {
            let id = policy.validate(raw).unwrap();
            assert_eq!(id.as_str(), raw);
        }
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert_eq!(IdentityPolicy::default().validate(""), Err(IdentityError::Empty));
    }

    #[test]
    fn test_validate_rejects_path_separators() {
        let policy = IdentityPolicy::default();
        for raw in ["../etc", "../etc/passwd", "a/b", "a\\b", "/abs", "../../malicious"] {
            assert_eq!(policy.validate(raw), Err(IdentityError::PathSeparator), "{raw}");
        }
    }

    #[test]
    fn test_validate_rejects_disallowed_characters() {
        let policy = IdentityPolicy::default();
        for raw in ["..", ".", "a.b", "a b", "id;rm", "ünï", "a\0b", "x:y"] {
            assert_eq!(policy.validate(raw), Err(IdentityError::InvalidCharacter), "{raw:?}");
        }
    }

    #[test]
    fn test_validate_enforces_max_length() {
        let policy = IdentityPolicy::new(8);
        assert!(policy.validate("12345678").is_ok());
        assert_eq!(policy.validate("123456789"), Err(IdentityError::TooLong(8)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(IdentityError::Empty.to_string(), "UUID is required");
        assert_eq!(
            IdentityError::PathSeparator.to_string(),
            "UUID must not contain path separators"
        );
    }

    #[test]
    fn test_container_name() {
        assert!(is_valid_container_name("nginx"));
        assert!(is_valid_container_name("proxy_nginx.1"));
        assert!(!is_valid_container_name(""));
        assert!(!is_valid_container_name("-nginx"));
        assert!(!is_valid_container_name("nginx;reboot"));
    }

    #[test]
    fn test_domain() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("app-1.tenant.example.org"));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("-bad.example.com"));
        assert!(!is_valid_domain("bad..example.com"));
        assert!(!is_valid_domain("exa mple.com"));
        assert!(!is_valid_domain("example.com/../x"));
    }
}
