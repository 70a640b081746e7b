//! 状态归一化
//!
//! 把 `docker compose ps --format json` 的输出转换为 [`ContainerStatus`] 列表。
//! 不同版本的 compose 输出形态不同：新版本逐行输出 JSON 对象，旧版本输出一个 JSON 数组。
//! 先尝试数组，失败再逐行解析；单条记录格式错误只跳过该条。

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::ContainerStatus;

/// compose ps 的单条记录（所有字段都可能缺失）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ComposePsRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    health: Option<String>,
    #[serde(default)]
    publishers: Option<Vec<Value>>,
}

/// 端口发布信息
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Publisher {
    published_port: Option<u64>,
    target_port: Option<u64>,
    protocol: Option<String>,
}

impl Publisher {
    /// `<published>:<target>/<protocol>`，任一字段缺失返回 None
    fn format(&self) -> Option<String> {
        match (self.published_port, self.target_port, &self.protocol) {
            (Some(published), Some(target), Some(protocol)) => {
                Some(format!("{}:{}/{}", published, target, protocol))
            }
            _ => None,
        }
    }
}

impl From<ComposePsRecord> for ContainerStatus {
    fn from(record: ComposePsRecord) -> Self {
        let ports = record
            .publishers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| serde_json::from_value::<Publisher>(value).ok())
            .filter_map(|publisher| publisher.format())
            .collect();

        ContainerStatus {
            name: record.name.unwrap_or_default(),
            state: record.state.unwrap_or_default(),
            health: record.health.unwrap_or_default(),
            ports,
        }
    }
}

/// 归一化运行时输出
pub fn normalize(raw: &str) -> Vec<ContainerStatus> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // 数组形式：逐个元素解码，坏元素跳过
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return items.into_iter().filter_map(decode_record).collect();
    }

    // 逐行 JSON
    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value) => decode_record(value),
            Err(e) => {
                debug!(error = %e, "Skipping malformed status line");
                None
            }
        })
        .collect()
}

fn decode_record(value: Value) -> Option<ContainerStatus> {
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value::<ComposePsRecord>(value) {
        Ok(record) => Some(record.into()),
        Err(e) => {
            debug!(error = %e, "Skipping malformed status record");
            None
        }
    }
}
