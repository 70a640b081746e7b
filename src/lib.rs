//! Docker Control - compose 部署生命周期控制服务
//!
//! 以 ID 管理 docker compose 部署：启动、停止、重启、更新、状态查询，
//! 以及容器内进程 reload 和证书签发两个辅助操作

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::env::constants::VERSION;
use crate::config::{EnvConfig, LogFormat};
use crate::infra::executor::{discover_docker_host, DockerExecutorConfig};
use crate::infra::{CommandRunner, DockerComposeExecutor};
use crate::state::app_state::{get_shutdown_token, trigger_shutdown};
use crate::state::AppState;

/// 命令行传入的运行时覆盖项，优先级高于环境变量
#[derive(Default, Clone, Debug)]
pub struct RuntimeConfig {
    /// 覆盖监听端口
    pub port_override: Option<u16>,
    /// 覆盖部署根目录
    pub deployments_dir: Option<PathBuf>,
    /// 覆盖日志级别
    pub log_level: Option<String>,
}

/// 初始化日志
fn init_tracing(config: &EnvConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', falling back to info", config.log_level);
        EnvFilter::new("info")
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("Tracing already initialized: {}", e);
    }
}

/// 加载配置并运行服务，直到收到关闭信号
pub async fn run_with_config(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let mut config = EnvConfig::from_env();
    config.apply_overrides(&runtime);

    init_tracing(&config);

    info!(version = VERSION, "Docker control service starting");

    tokio::fs::create_dir_all(&config.deployments_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create deployments directory {}",
                config.deployments_dir.display()
            )
        })?;

    let docker_host = discover_docker_host();
    if let Some(host) = &docker_host {
        info!(docker_host = %host, "Discovered Docker socket");
    }

    if !CommandRunner::is_available("docker").await {
        warn!("docker CLI not found in PATH; deployment operations will fail until it is installed");
    }

    let executor = DockerComposeExecutor::detect(DockerExecutorConfig {
        command_timeout: config.command_timeout,
        docker_host,
        certbot_email: config.certbot_email.clone(),
    })
    .await;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config, Arc::new(executor)));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "Docker control service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Docker control service stopped");
    Ok(())
}

/// 等待 Ctrl+C / SIGTERM，并取消所有进行中的操作
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    // 确保全局 token 在触发前已初始化
    let _ = get_shutdown_token();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }

    trigger_shutdown();
}
