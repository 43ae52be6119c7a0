//! # AWS Image Proxy 主程序
//!
//! 在本机回环地址上为 containerd 等镜像客户端提供 ECR pull-through cache 凭据代理

use std::path::PathBuf;

use aws_image_proxy::{
    AppConfig, bootstrap,
    config::{CONFIG_PATH_ENV, ConfigManager},
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
};
use clap::{Parser, Subcommand};

/// ECR pull-through cache 凭据代理
#[derive(Debug, Parser)]
#[command(name = "aws-image-proxy", about, disable_version_flag = true)]
struct Cli {
    /// TOML 配置文件路径
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 启动代理（默认）
    Run(RunArgs),
    /// 打印版本信息
    Version,
}

/// 命令行覆盖，优先级高于配置文件与环境变量
#[derive(Debug, Default, clap::Args)]
struct RunArgs {
    /// 监听端口
    #[arg(long)]
    port: Option<u16>,

    /// 监听地址，必须是回环地址
    #[arg(long)]
    host: Option<String>,

    /// 只使用以此开头的 pull-through cache 规则
    #[arg(long)]
    prefix: Option<String>,

    /// AWS 区域，不设置时从 SDK 默认链（含实例元数据）解析
    #[arg(long)]
    region: Option<String>,
}

impl RunArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(prefix) = self.prefix {
            config.registry.prefix_filter = prefix;
        }
        if let Some(region) = self.region {
            config.registry.region = Some(region);
        }
    }
}

fn version_line() -> String {
    format!(
        "aws-image-proxy {} (git {} {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("unknown"),
        option_env!("GIT_REF").unwrap_or("unknown"),
    )
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let args = match cli.command {
        Some(Command::Version) => {
            println!("{}", version_line());
            return;
        }
        Some(Command::Run(args)) => args,
        None => RunArgs::default(),
    };

    let manager = match ConfigManager::load(cli.config.as_deref()) {
        Ok(manager) => manager,
        Err(e) => {
            logging::init_logging(None);
            lerror!(
                "system",
                LogStage::Configuration,
                LogComponent::Config,
                "config_load_failed",
                "配置加载失败",
                category = ?e.category(),
                error = %e
            );
            std::process::exit(1);
        }
    };

    logging::init_logging(Some(&manager.config().logging.level));
    manager.log_summary();

    let mut config = manager.into_config();
    args.apply(&mut config);

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动",
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        prefix_filter = %config.registry.prefix_filter
    );

    if let Err(e) = bootstrap::run(config).await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            "服务启动失败",
            category = ?e.category(),
            error = %e
        );
        std::process::exit(1);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::try_parse_from(["aws-image-proxy"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_run_flags_override_config() {
        let cli = Cli::try_parse_from([
            "aws-image-proxy",
            "run",
            "--port",
            "5000",
            "--prefix",
            "team-",
            "--region",
            "eu-west-1",
        ])
        .unwrap();
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run subcommand");
        };

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.registry.prefix_filter, "team-");
        assert_eq!(config.registry.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_version_subcommand() {
        let cli = Cli::try_parse_from(["aws-image-proxy", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
        assert!(version_line().starts_with("aws-image-proxy "));
    }
}
