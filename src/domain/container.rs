//! 容器相关领域模型

use serde::{Deserialize, Serialize};

/// 单个容器的运行时状态（每次查询时实时获取，不缓存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub state: String,
    pub health: String,
    /// 格式 `<published>:<target>/<protocol>`
    pub ports: Vec<String>,
}

impl ContainerStatus {
    /// state 中包含 "running"（不区分大小写）
    pub fn is_running(&self) -> bool {
        self.state.to_lowercase().contains("running")
    }
}
