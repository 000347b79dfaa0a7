//! Build Notifier CLI
//!
//! 把 CI 构建事件和自定义消息推送到 BearyChat

use anyhow::Result;
use build_notifier::{
    cli::{ClassifyArgs, NotifyArgs, SendArgs, TestConnectionArgs},
    NotifierConfig,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "bcn")]
#[command(about = "Build Notifier - 把 CI 构建事件推送到 BearyChat")]
#[command(version)]
struct Cli {
    /// 配置文件路径 (默认: ~/.config/build-notifier/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// 只打印请求体，不发送
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 处理构建开始/完成事件
    Notify(NotifyArgs),
    /// 发送自定义消息
    Send(SendArgs),
    /// 发送测试消息验证配置
    TestConnection(TestConnectionArgs),
    /// 输出构建的状态分类
    Classify(ClassifyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug bcn notify ...
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("build_notifier=info,bcn=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    let dry_run = cli.dry_run;
    let load_config = || -> Result<NotifierConfig> {
        let config = NotifierConfig::auto_load(cli.config.as_deref())?;
        debug!(jobs = config.jobs.len(), "Config loaded");
        Ok(config)
    };

    match cli.command {
        Commands::Notify(args) => {
            build_notifier::cli::handle_notify(args, &load_config()?, dry_run).await?;
        }
        Commands::Send(args) => {
            build_notifier::cli::handle_send(args, &load_config()?, dry_run).await?;
        }
        Commands::TestConnection(args) => {
            build_notifier::cli::handle_test_connection(args, &load_config()?, dry_run).await?;
        }
        Commands::Classify(args) => {
            build_notifier::cli::handle_classify(args)?;
        }
    }

    Ok(())
}
