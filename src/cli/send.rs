//! `send` / `test-connection` 命令处理

use anyhow::Result;
use clap::Args;
use std::collections::BTreeMap;
use tracing::info;

use super::output::{format_output, DeliveryReport};
use crate::config::NotifierConfig;
use crate::notification::{SendRequest, WebhookClient};

/// send 命令参数
#[derive(Args)]
pub struct SendArgs {
    /// 消息正文
    pub message: String,
    /// 附件标题
    #[arg(long)]
    pub title: Option<String>,
    /// 附件正文
    #[arg(long)]
    pub text: Option<String>,
    /// 通知栏文本
    #[arg(long)]
    pub fallback: Option<String>,
    /// 附件链接
    #[arg(long)]
    pub url: Option<String>,
    /// 颜色，如 #FF0000
    #[arg(long)]
    pub color: Option<String>,
    /// 逗号分隔的房间，覆盖配置
    #[arg(long)]
    pub channel: Option<String>,
    /// webhook URL，覆盖配置
    #[arg(long)]
    pub webhook: Option<String>,
    /// 投递失败时以非零状态退出
    #[arg(long)]
    pub fail_on_error: bool,
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// test-connection 命令参数
#[derive(Args)]
pub struct TestConnectionArgs {
    #[arg(long)]
    pub webhook: Option<String>,
    #[arg(long)]
    pub channel: Option<String>,
}

impl From<SendArgs> for SendRequest {
    fn from(args: SendArgs) -> Self {
        SendRequest {
            message: args.message,
            title: args.title,
            attachment_text: args.text,
            notification: args.fallback,
            url: args.url,
            color: args.color,
            channel: args.channel,
            webhook: args.webhook,
            fail_on_error: args.fail_on_error,
        }
    }
}

fn process_env() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

/// 处理 send 命令
pub async fn handle_send(args: SendArgs, config: &NotifierConfig, dry_run: bool) -> Result<()> {
    let json = args.json;
    let request = SendRequest::from(args);
    let target = request.target(config, &process_env());
    let client = WebhookClient::new(config.webhook_config(dry_run))?;

    let result = request.send(&client, &target).await?;
    let report = DeliveryReport::from_delivery(&result, None);
    println!("{}", format_output(&report, json, || report.summary()));
    Ok(())
}

/// 处理 test-connection 命令
pub async fn handle_test_connection(args: TestConnectionArgs, config: &NotifierConfig, dry_run: bool) -> Result<()> {
    let request = SendRequest {
        webhook: args.webhook,
        channel: args.channel,
        ..SendRequest::test_connection(config.server_url().as_deref())
    };
    let target = request.target(config, &process_env());
    let client = WebhookClient::new(config.webhook_config(dry_run))?;

    request.send(&client, &target).await?;
    info!(rooms = target.rooms.len(), "Connection test posted");
    println!("Success");
    Ok(())
}
