//! Docker Control - compose 部署生命周期控制服务
//!
//! Usage:
//! - Normal mode: `docker-control`
//! - With custom port: `docker-control --port 50052`
//! - Custom deployments directory: `docker-control --deployments-dir /srv/deployments`

use std::path::PathBuf;

use docker_control::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                if config.port_override.is_none() {
                    eprintln!("Ignoring invalid port: {}", args[i + 1]);
                }
                i += 2;
            }
            "--deployments-dir" if i + 1 < args.len() => {
                config.deployments_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--log-level" if i + 1 < args.len() => {
                config.log_level = Some(args[i + 1].clone());
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Docker Control - compose 部署生命周期控制服务");
    println!();
    println!("USAGE:");
    println!("    docker-control [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>             Override the listening port (DOCKER_CONTROL_PORT)");
    println!("    --deployments-dir <DIR>   Override the deployments root (DOCKER_CONTROL_DEPLOYMENTS_DIR)");
    println!("    --log-level <LEVEL>       Override the log level (DOCKER_CONTROL_LOG_LEVEL)");
    println!("    -h, --help                Print help information");
    println!();
    println!("EXAMPLES:");
    println!("    docker-control                                  # Defaults");
    println!("    docker-control --port 50052                     # Custom port");
    println!("    docker-control --deployments-dir /srv/apps      # Custom deployments root");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = parse_args();
    docker_control::run_with_config(config).await
}
