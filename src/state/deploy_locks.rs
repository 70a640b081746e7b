//! 按部署 ID 的互斥锁
//!
//! 同一 ID 的操作串行执行（防止清单写入丢失、同一 compose 项目被并发操作），
//! 不同 ID 之间互不影响。没有操作持有时条目自动回收。

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::DeploymentId;

/// 持有期间独占该部署
pub type DeploymentGuard = OwnedMutexGuard<()>;

/// 部署锁注册表
#[derive(Default)]
pub struct DeploymentLocks {
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl DeploymentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定部署的锁，等待其他操作完成
    pub async fn acquire(&self, id: &DeploymentId) -> DeploymentGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            // 清理已无人持有的条目
            locks.retain(|_, weak| weak.strong_count() > 0);

            match locks.get(id.as_str()).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(id.as_str().to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    /// 当前有操作在执行或等待的部署数量
    pub async fn active_count(&self) -> usize {
        let locks = self.locks.lock().await;
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
