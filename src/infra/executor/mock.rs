//! 内存执行器（测试替身）
//!
//! 行为完全确定：每个操作可单独设置为失败，status 返回预设输出，所有调用按顺序记录

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{ComposeProject, ExecutorError, RuntimeExecutor};

/// 默认的 `docker compose ps --format json` 输出
pub const DEFAULT_STATUS_OUTPUT: &str = r#"[{"Name":"test-service","State":"running","Health":"healthy","Publishers":[{"PublishedPort":8080,"TargetPort":8080,"Protocol":"tcp"}]}]"#;

/// 记录下来的一次调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorCall {
    Up(String),
    Down(String),
    Restart(String),
    Status(String),
    Reload(String),
    IssueCertificate(String),
}

#[derive(Debug)]
struct MockInner {
    fail_up: bool,
    fail_down: bool,
    fail_restart: bool,
    fail_status: bool,
    fail_reload: bool,
    fail_certificate: bool,
    status_output: String,
    delay: Option<Duration>,
    calls: Vec<ExecutorCall>,
    /// 当前正在执行中的调用数 / 观察到的最大并发
    in_flight: usize,
    max_in_flight: usize,
}

/// 确定性的内存执行器
#[derive(Debug)]
pub struct MockExecutor {
    inner: Mutex<MockInner>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockInner {
                fail_up: false,
                fail_down: false,
                fail_restart: false,
                fail_status: false,
                fail_reload: false,
                fail_certificate: false,
                status_output: DEFAULT_STATUS_OUTPUT.to_string(),
                delay: None,
                calls: Vec::new(),
                in_flight: 0,
                max_in_flight: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        // 测试替身：锁中毒时继续使用内部数据
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_up(&self, fail: bool) {
        self.lock().fail_up = fail;
    }

    pub fn fail_down(&self, fail: bool) {
        self.lock().fail_down = fail;
    }

    pub fn fail_restart(&self, fail: bool) {
        self.lock().fail_restart = fail;
    }

    pub fn fail_status(&self, fail: bool) {
        self.lock().fail_status = fail;
    }

    pub fn fail_reload(&self, fail: bool) {
        self.lock().fail_reload = fail;
    }

    pub fn fail_certificate(&self, fail: bool) {
        self.lock().fail_certificate = fail;
    }

    /// 设置 status 返回的原始输出
    pub fn set_status_output(&self, output: impl Into<String>) {
        self.lock().status_output = output.into();
    }

    /// 每次调用前等待一段时间，用于观察并发
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// 所有调用记录
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// 观察到的最大同时执行调用数
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    async fn enter(
        &self,
        call: ExecutorCall,
        cancel: &CancellationToken,
        operation: &'static str,
    ) -> Result<MockInnerSnapshot, ExecutorError> {
        let delay = {
            let mut inner = self.lock();
            inner.calls.push(call);
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            inner.delay
        };

        let cancelled = match delay {
            Some(delay) => tokio::select! {
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            },
            None => cancel.is_cancelled(),
        };

        let mut inner = self.lock();
        inner.in_flight -= 1;
        if cancelled {
            return Err(ExecutorError::failed(operation, "cancelled"));
        }
        Ok(MockInnerSnapshot {
            fail_up: inner.fail_up,
            fail_down: inner.fail_down,
            fail_restart: inner.fail_restart,
            fail_status: inner.fail_status,
            fail_reload: inner.fail_reload,
            fail_certificate: inner.fail_certificate,
            status_output: inner.status_output.clone(),
        })
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

struct MockInnerSnapshot {
    fail_up: bool,
    fail_down: bool,
    fail_restart: bool,
    fail_status: bool,
    fail_reload: bool,
    fail_certificate: bool,
    status_output: String,
}

#[async_trait]
impl RuntimeExecutor for MockExecutor {
    async fn up(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let state = self.enter(ExecutorCall::Up(project.name.clone()), cancel, "compose up").await?;
        if state.fail_up {
            return Err(ExecutorError::failed("compose up", "mock compose up failed"));
        }
        Ok(())
    }

    async fn down(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let state = self.enter(ExecutorCall::Down(project.name.clone()), cancel, "compose down").await?;
        if state.fail_down {
            return Err(ExecutorError::failed("compose down", "mock compose down failed"));
        }
        Ok(())
    }

    async fn restart(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let state = self
            .enter(ExecutorCall::Restart(project.name.clone()), cancel, "compose restart")
            .await?;
        if state.fail_restart {
            return Err(ExecutorError::failed("compose restart", "mock compose restart failed"));
        }
        Ok(())
    }

    async fn status(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<String, ExecutorError> {
        let state = self.enter(ExecutorCall::Status(project.name.clone()), cancel, "compose ps").await?;
        if state.fail_status {
            return Err(ExecutorError::failed("compose ps", "mock compose status failed"));
        }
        Ok(state.status_output)
    }

    async fn reload_process(&self, container: &str, cancel: &CancellationToken) -> Result<String, ExecutorError> {
        let state = self.enter(ExecutorCall::Reload(container.to_string()), cancel, "nginx reload").await?;
        if state.fail_reload {
            return Err(ExecutorError::failed("nginx reload", "mock reload failed"));
        }
        Ok("signal process started".to_string())
    }

    async fn issue_certificate(&self, domain: &str, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let state = self
            .enter(ExecutorCall::IssueCertificate(domain.to_string()), cancel, "certbot")
            .await?;
        if state.fail_certificate {
            return Err(ExecutorError::failed("certbot", "mock certbot failed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ComposeProject {
        ComposeProject::new("test-project", "/tmp/test-project", "/tmp/test-project/docker-compose.yml")
    }

    #[tokio::test]
    async fn test_mock_up_and_failure() {
        let mock = MockExecutor::new();
        let cancel = CancellationToken::new();

        assert!(mock.up(&project(), &cancel).await.is_ok());

        mock.fail_up(true);
        let err = mock.up(&project(), &cancel).await.unwrap_err();
        assert!(err.to_string().contains("mock compose up failed"));

        assert_eq!(
            mock.calls(),
            vec![
                ExecutorCall::Up("test-project".to_string()),
                ExecutorCall::Up("test-project".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_status_output() {
        let mock = MockExecutor::new();
        let cancel = CancellationToken::new();

        let raw = mock.status(&project(), &cancel).await.unwrap();
        assert_eq!(raw, DEFAULT_STATUS_OUTPUT);

        mock.fail_status(true);
        let err = mock.status(&project(), &cancel).await.unwrap_err();
        assert!(err.to_string().contains("mock compose status failed"));
    }

    #[tokio::test]
    async fn test_mock_honours_cancellation() {
        let mock = MockExecutor::new();
        mock.set_delay(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = mock.down(&project(), &cancel).await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
