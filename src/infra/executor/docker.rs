//! Docker Compose executor
//!
//! Drives `docker compose` (or legacy `docker-compose`) and plain `docker`
//! through [`CommandRunner`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ComposeProject, ExecutorError, RuntimeExecutor};
use crate::infra::command::{CommandRunner, CommandSpec};

const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Configuration for the Docker executor
#[derive(Debug, Clone)]
pub struct DockerExecutorConfig {
    /// Per-command deadline
    pub command_timeout: Duration,
    /// Value exported as DOCKER_HOST to every command (None = inherit)
    pub docker_host: Option<String>,
    /// Contact email passed to certbot (None = `admin@<domain>`)
    pub certbot_email: Option<String>,
}

impl Default for DockerExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(300),
            docker_host: None,
            certbot_email: None,
        }
    }
}

/// Executor backed by the docker CLI
pub struct DockerComposeExecutor {
    config: DockerExecutorConfig,
    compose_cmd: &'static str,
    compose_args: Vec<&'static str>,
}

impl DockerComposeExecutor {
    /// Create an executor, detecting which compose command is installed
    pub async fn detect(config: DockerExecutorConfig) -> Self {
        let (compose_cmd, compose_args) = detect_compose_command().await;
        info!(
            command = compose_cmd,
            args = ?compose_args,
            docker_host = ?config.docker_host,
            "Using compose command"
        );
        Self {
            config,
            compose_cmd,
            compose_args,
        }
    }

    /// Create an executor using `docker compose`
    pub fn new(config: DockerExecutorConfig) -> Self {
        Self {
            config,
            compose_cmd: "docker",
            compose_args: vec!["compose"],
        }
    }

    fn compose(&self, project: &ComposeProject) -> CommandSpec {
        let manifest = project.manifest.to_string_lossy().into_owned();
        let spec = CommandSpec::new(self.compose_cmd)
            .args(self.compose_args.iter().copied())
            .args(["-p", project.name.as_str(), "-f", manifest.as_str()])
            .current_dir(project.dir());
        self.with_docker_env(spec)
    }

    fn docker(&self) -> CommandSpec {
        self.with_docker_env(CommandSpec::new("docker"))
    }

    fn with_docker_env(&self, spec: CommandSpec) -> CommandSpec {
        match &self.config.docker_host {
            Some(host) => spec.env("DOCKER_HOST", host),
            None => spec,
        }
    }

    /// Run a command, mapping non-zero exit to [`ExecutorError::Failed`]
    async fn exec(
        &self,
        operation: &'static str,
        spec: CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<String, ExecutorError> {
        let output = CommandRunner::run(&spec, cancel, self.config.command_timeout)
            .await
            .map_err(|source| ExecutorError::Command { operation, source })?;

        if output.success() {
            debug!(operation, "Command succeeded");
            Ok(output.stdout)
        } else {
            let mut diagnostic = output.combined();
            if diagnostic.is_empty() {
                diagnostic = format!("exit status {}", output.status);
            }
            Err(ExecutorError::failed(operation, diagnostic))
        }
    }
}

#[async_trait]
impl RuntimeExecutor for DockerComposeExecutor {
    async fn up(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let spec = self.compose(project).args(["up", "-d", "--remove-orphans"]);
        self.exec("docker compose up", spec, cancel).await.map(|_| ())
    }

    async fn down(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let spec = self.compose(project).args(["down", "--remove-orphans"]);
        self.exec("docker compose down", spec, cancel).await.map(|_| ())
    }

    async fn restart(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let spec = self.compose(project).args(["restart"]);
        self.exec("docker compose restart", spec, cancel).await.map(|_| ())
    }

    async fn status(&self, project: &ComposeProject, cancel: &CancellationToken) -> Result<String, ExecutorError> {
        let spec = self.compose(project).args(["ps", "--all", "--format", "json"]);
        self.exec("docker compose ps", spec, cancel).await
    }

    async fn reload_process(&self, container: &str, cancel: &CancellationToken) -> Result<String, ExecutorError> {
        let spec = self.docker().args(["exec", container, "nginx", "-s", "reload"]);
        self.exec("nginx reload", spec, cancel).await
    }

    async fn issue_certificate(&self, domain: &str, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let email = self
            .config
            .certbot_email
            .clone()
            .unwrap_or_else(|| format!("admin@{}", domain));
        let spec = self.docker().args(certbot_args(domain, &email));
        self.exec("certbot", spec, cancel).await.map(|_| ())
    }
}

fn certbot_args(domain: &str, email: &str) -> Vec<String> {
    [
        "run", "--rm",
        "-v", "certbot_certs:/etc/letsencrypt",
        "-v", "certbot_www:/var/www/certbot",
        "certbot/certbot",
        "certonly", "--webroot", "-w", "/var/www/certbot",
        "--email", email,
        "-d", domain,
        "--rsa-key-size", "4096",
        "--agree-tos",
        "--non-interactive",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Detect which docker-compose command to use
async fn detect_compose_command() -> (&'static str, Vec<&'static str>) {
    // Prefer the compose plugin, fall back to the standalone binary
    let probe = CommandSpec::new("docker").args(["compose", "version"]);
    let plugin = CommandRunner::run(&probe, &CancellationToken::new(), Duration::from_secs(10))
        .await
        .map(|o| o.success())
        .unwrap_or(false);

    if plugin {
        ("docker", vec!["compose"])
    } else if CommandRunner::is_available("docker-compose").await {
        ("docker-compose", vec![])
    } else {
        ("docker", vec!["compose"])
    }
}

/// Find a Docker socket when DOCKER_HOST is not set
///
/// Tries `/var/run/docker.sock`, then `~/.docker/desktop/docker.sock`.
pub fn discover_docker_host() -> Option<String> {
    if let Ok(host) = std::env::var("DOCKER_HOST") {
        if !host.is_empty() {
            return None;
        }
    }

    let mut candidates = vec![PathBuf::from(DEFAULT_DOCKER_SOCKET)];
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(Path::new(&home).join(".docker").join("desktop").join("docker.sock"));
    }

    candidates
        .into_iter()
        .find(|path| is_socket(path))
        .map(|path| format!("unix://{}", path.display()))
}

#[cfg(unix)]
fn is_socket(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;
    std::fs::metadata(path)
        .map(|m| m.file_type().is_socket())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_socket(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ComposeProject {
        ComposeProject::new("abc123", "/srv/deployments/abc123", "/srv/deployments/abc123/docker-compose.yml")
    }

    #[test]
    fn test_compose_command_line() {
        let executor = DockerComposeExecutor::new(DockerExecutorConfig::default());
        let spec = executor.compose(&project()).args(["up", "-d"]);

        assert_eq!(spec.program, "docker");
        assert_eq!(
            spec.args,
            vec![
                "compose",
                "-p",
                "abc123",
                "-f",
                "/srv/deployments/abc123/docker-compose.yml",
                "up",
                "-d"
            ]
        );
        assert_eq!(spec.work_dir, Some(PathBuf::from("/srv/deployments/abc123")));
        assert!(spec.envs.is_empty());
    }

    #[test]
    fn test_docker_host_is_exported() {
        let executor = DockerComposeExecutor::new(DockerExecutorConfig {
            docker_host: Some("unix:///tmp/docker.sock".to_string()),
            ..Default::default()
        });
        let spec = executor.docker();

        assert_eq!(
            spec.envs,
            vec![("DOCKER_HOST".to_string(), "unix:///tmp/docker.sock".to_string())]
        );
    }

    #[test]
    fn test_certbot_args() {
        let args = certbot_args("example.com", "ops@example.com");
        let email = args.iter().position(|a| a == "--email").unwrap();
        assert_eq!(args[email + 1], "ops@example.com");
        let domain = args.iter().position(|a| a == "-d").unwrap();
        assert_eq!(args[domain + 1], "example.com");
        assert_eq!(args.last().map(String::as_str), Some("--non-interactive"));
    }
}
