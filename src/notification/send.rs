//! 自由格式的消息发送（不依赖构建历史）
//!
//! 对应流水线里的 "send message" 步骤，以及 `test-connection` 命令。

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::channel::DeliveryResult;
use super::composer::expand_env;
use super::payload::NotificationPayload;
use super::webhook::{Endpoint, WebhookClient, WebhookTarget};
use crate::config::NotifierConfig;
use crate::status::color;

/// 一次自由格式发送请求
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub message: String,
    /// 附件标题
    pub title: Option<String>,
    /// 附件正文
    pub attachment_text: Option<String>,
    /// 通知栏文本，缺省为 `message`
    pub notification: Option<String>,
    pub url: Option<String>,
    /// 缺省为灰色
    pub color: Option<String>,
    /// 逗号分隔的房间，覆盖配置
    pub channel: Option<String>,
    /// 覆盖配置中的 webhook
    pub webhook: Option<String>,
    /// 投递失败时返回错误
    pub fail_on_error: bool,
}

impl SendRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// 连接测试消息
    pub fn test_connection(server_url: Option<&str>) -> Self {
        let message = match server_url {
            Some(url) => format!("Build notifier has been configured correctly. {}", url),
            None => "Build notifier has been configured correctly.".to_string(),
        };
        Self {
            fail_on_error: true,
            ..Self::new(message)
        }
    }

    pub fn payload(&self) -> NotificationPayload {
        let fallback = self
            .notification
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.message.clone());
        let color = self
            .color
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| color::GREY.to_string());

        NotificationPayload::new(
            self.message.clone(),
            fallback,
            self.attachment_text.clone().unwrap_or_default(),
            color,
        )
        .with_url(self.url.clone().filter(|u| !u.trim().is_empty()))
        .with_attachment_title(self.title.clone().filter(|t| !t.trim().is_empty()))
    }

    /// 请求中的 webhook/channel 优先于配置，二者都会用 `env` 展开
    pub fn target(&self, config: &NotifierConfig, env: &BTreeMap<String, String>) -> WebhookTarget {
        let mut target = config.target_for(None, env);
        if let Some(webhook) = self.webhook.as_deref().filter(|w| !w.trim().is_empty()) {
            target.endpoint = Some(Endpoint::Url(expand_env(webhook.trim(), env)));
        }
        if let Some(channel) = self.channel.as_deref().filter(|c| !c.trim().is_empty()) {
            target.rooms = WebhookTarget::parse_rooms(&expand_env(channel, env));
        }
        target
    }

    /// 发送；`fail_on_error` 时投递失败返回错误，否则只记录日志
    pub async fn send(&self, client: &WebhookClient, target: &WebhookTarget) -> Result<DeliveryResult> {
        let result = client.deliver(target, &self.payload()).await;
        if result.success {
            info!(rooms = result.rooms.len(), "Message sent");
            return Ok(result);
        }

        if self.fail_on_error {
            bail!("Notification failed");
        }
        warn!("Notification failed");
        Ok(result)
    }
}
