//! `notify` / `classify` 命令处理
//!
//! 从 JSON 历史快照中读取构建记录，触发一次生命周期事件或只输出分类结果。

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use super::output::{format_output, DeliveryReport};
use crate::build::{BuildHistory, HistorySnapshot, ResultKind};
use crate::config::NotifierConfig;
use crate::notification::{WebhookChannel, WebhookClient};
use crate::notifier::BuildNotifier;
use crate::status::{classify_build, effective_previous_of};

/// 生命周期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LifecycleEvent {
    Started,
    Completed,
}

/// notify 命令参数
#[derive(Args)]
pub struct NotifyArgs {
    /// 生命周期事件
    #[arg(long, value_enum)]
    pub event: LifecycleEvent,
    /// 构建历史快照 (JSON)
    #[arg(long)]
    pub history: PathBuf,
    /// 项目全名
    #[arg(long)]
    pub project: String,
    /// 构建号
    #[arg(long)]
    pub build: u32,
    /// 投递失败时以非零状态退出
    #[arg(long)]
    pub fail_on_error: bool,
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// classify 命令参数
#[derive(Args)]
pub struct ClassifyArgs {
    /// 构建历史快照 (JSON)
    #[arg(long)]
    pub history: PathBuf,
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub build: u32,
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Classification {
    project: String,
    build: u32,
    result: ResultKind,
    effective_previous: ResultKind,
    status: String,
    color: &'static str,
}

/// 处理 notify 命令
pub async fn handle_notify(args: NotifyArgs, config: &NotifierConfig, dry_run: bool) -> Result<()> {
    let history = HistorySnapshot::load(&args.history)?;
    let (project, build) = history
        .find_build(&args.project, args.build)
        .ok_or_else(|| anyhow!("Build {} #{} not found in {}", args.project, args.build, args.history.display()))?;

    let env = history.environment(project, build).unwrap_or_else(|e| {
        debug!(error = %e, "Build environment unavailable");
        BTreeMap::new()
    });
    let target = config.target_for(Some(&project.name), &env);
    let client = WebhookClient::new(config.webhook_config(dry_run))?;

    let notifier = BuildNotifier::new(WebhookChannel::new(client, target), config.policy_for(&project.name))
        .with_server_url(config.server_url())
        .with_fail_on_error(args.fail_on_error);

    info!(project = %args.project, build = args.build, event = ?args.event, "Handling build event");
    let outcome = match args.event {
        LifecycleEvent::Started => notifier.on_started(&history, &args.project, args.build).await?,
        LifecycleEvent::Completed => notifier.on_completed(&history, &args.project, args.build).await?,
    };

    let report = DeliveryReport::from_outcome(&outcome);
    println!("{}", format_output(&report, args.json, || report.summary()));
    Ok(())
}

/// 处理 classify 命令
pub fn handle_classify(args: ClassifyArgs) -> Result<()> {
    let history = HistorySnapshot::load(&args.history)?;
    let (project, build) = history
        .find_build(&args.project, args.build)
        .ok_or_else(|| anyhow!("Build {} #{} not found in {}", args.project, args.build, args.history.display()))?;

    let status = classify_build(project, build);
    let classification = Classification {
        project: project.name.clone(),
        build: build.number,
        result: build.outcome.result,
        effective_previous: effective_previous_of(project, build),
        status: status.to_string(),
        color: status.color(),
    };

    println!(
        "{}",
        format_output(&classification, args.json, || classification.status.clone())
    );
    Ok(())
}
