//! 部署存储
//!
//! 布局：`<base>/<id>/docker-compose.yml`，每个部署一个目录、一个清单文件，没有其他持久化状态

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::DeploymentId;
use crate::infra::ComposeProject;

/// 清单文件名
pub const MANIFEST_FILE: &str = "docker-compose.yml";

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create deployment directory: {0}")]
    CreateDir(#[source] std::io::Error),

    #[error("Failed to write compose file: {0}")]
    WriteManifest(#[source] std::io::Error),
}

/// 单个部署的存储位置
///
/// 只能由 [`DeploymentStore::resolve`] 从已校验的 ID 计算得到
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPaths {
    id: DeploymentId,
    dir: PathBuf,
    manifest: PathBuf,
}

impl DeploymentPaths {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// 交给执行器的项目描述
    pub fn project(&self) -> ComposeProject {
        ComposeProject::new(self.id.as_str(), &self.dir, &self.manifest)
    }
}

/// 部署存储
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    base_dir: PathBuf,
}

impl DeploymentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 路径解析：纯函数，结果总是 base_dir 的直接子目录
    pub fn resolve(&self, id: &DeploymentId) -> DeploymentPaths {
        let dir = self.base_dir.join(id.as_str());
        let manifest = dir.join(MANIFEST_FILE);
        DeploymentPaths {
            id: id.clone(),
            dir,
            manifest,
        }
    }

    /// 部署记录是否存在（目录存在即视为存在）
    pub async fn exists(&self, paths: &DeploymentPaths) -> bool {
        tokio::fs::metadata(paths.dir())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// 创建部署目录
    pub async fn create_dir(&self, paths: &DeploymentPaths) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(paths.dir())
            .await
            .map_err(StorageError::CreateDir)
    }

    /// 写入清单（覆盖）
    pub async fn write_manifest(
        &self,
        paths: &DeploymentPaths,
        manifest: &str,
    ) -> Result<(), StorageError> {
        tokio::fs::write(paths.manifest(), manifest.as_bytes())
            .await
            .map_err(StorageError::WriteManifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdentityPolicy;
    use std::collections::HashSet;

    fn id(raw: &str) -> DeploymentId {
        IdentityPolicy::default().validate(raw).unwrap()
    }

    #[test]
    fn test_resolve_is_direct_child_of_base() {
        let store = DeploymentStore::new("/srv/deployments");
        for raw in ["abc123", "a", "tenant_1-app", "A-B_c"] {
            let paths = store.resolve(&id(raw));
            assert_eq!(paths.dir().parent(), Some(Path::new("/srv/deployments")));
            assert!(paths.dir().starts_with(store.base_dir()));
            assert_eq!(paths.manifest(), paths.dir().join(MANIFEST_FILE));
        }
    }

    #[test]
    fn test_resolve_is_injective() {
        let store = DeploymentStore::new("/srv/deployments");
        let ids = ["abc", "ABC", "abc-", "abc_", "ab-c", "a", "aa"];
        let dirs: HashSet<PathBuf> = ids
            .iter()
            .map(|raw| store.resolve(&id(raw)).dir().to_path_buf())
            .collect();
        assert_eq!(dirs.len(), ids.len());
    }

    #[test]
    fn test_project_uses_id_as_name() {
        let store = DeploymentStore::new("/srv/deployments");
        let project = store.resolve(&id("abc123")).project();
        assert_eq!(project.name, "abc123");
        assert_eq!(project.manifest, PathBuf::from("/srv/deployments/abc123/docker-compose.yml"));
    }

    #[tokio::test]
    async fn test_write_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DeploymentStore::new(tmp.path());
        let paths = store.resolve(&id("abc123"));

        assert!(!store.exists(&paths).await);
        store.create_dir(&paths).await.unwrap();
        assert!(store.exists(&paths).await);

        let manifest = "services:\n  web:\n    image: nginx\n";
        store.write_manifest(&paths, manifest).await.unwrap();
        assert_eq!(std::fs::read_to_string(paths.manifest()).unwrap(), manifest);
    }

    #[tokio::test]
    async fn test_write_without_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DeploymentStore::new(tmp.path());
        let paths = store.resolve(&id("missing"));

        let err = store.write_manifest(&paths, "x").await.unwrap_err();
        assert!(matches!(err, StorageError::WriteManifest(_)));
    }
}
