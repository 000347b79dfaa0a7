//! BearyChat Webhook 客户端模块
//!
//! 通过 HTTP POST 把通知发送到 BearyChat incoming webhook。
//! 所有失败（网络错误、非 2xx 响应、缺少配置）只记录日志并体现在
//! [`DeliveryResult`] 中，不会作为错误抛给调用方。

use anyhow::Result;
use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::channel::{DeliveryResult, NotificationChannel, RoomDelivery, SendResult};
use super::payload::{NotificationPayload, WirePayload};

/// 旧版 team-domain + token 方式使用的域名
pub const BEARYCHAT_HOST: &str = "bearychat.com";

/// 投递失败原因
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no webhook endpoint configured")]
    MissingEndpoint,
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("invalid HTTP client setup: {0}")]
    Client(String),
}

/// Webhook 地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// 完整的 incoming webhook URL
    Url(String),
    /// `https://{team_domain}.bearychat.com/api/hooks/jenkins/{token}`
    TeamToken { team_domain: String, token: String },
}

impl Endpoint {
    pub fn url(&self) -> String {
        match self {
            Endpoint::Url(url) => url.clone(),
            Endpoint::TeamToken { team_domain, token } => {
                format!("https://{}.{}/api/hooks/jenkins/{}", team_domain, BEARYCHAT_HOST, token)
            }
        }
    }
}

/// 投递目标
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WebhookTarget {
    pub endpoint: Option<Endpoint>,
    /// 房间 ID，按顺序逐个发送；为空时使用 webhook 默认频道
    pub rooms: Vec<String>,
}

impl WebhookTarget {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint: Some(endpoint),
            rooms: Vec::new(),
        }
    }

    pub fn with_rooms<I, S>(mut self, rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rooms = rooms.into_iter().map(Into::into).collect();
        self
    }

    /// 解析逗号分隔的房间列表
    pub fn parse_rooms(rooms: &str) -> Vec<String> {
        rooms
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// 出站代理
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 如 `http://proxy.internal:3128`
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Webhook 客户端配置
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// 超时时间 (秒)
    pub timeout_secs: u64,
    pub proxy: Option<ProxyConfig>,
    /// 只打印不发送
    pub dry_run: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            proxy: None,
            dry_run: false,
        }
    }
}

/// BearyChat Webhook 客户端
#[derive(Debug)]
pub struct WebhookClient {
    client: Client,
    dry_run: bool,
}

impl WebhookClient {
    /// 创建新的 Webhook 客户端
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(proxy) = &config.proxy {
            let mut p = Proxy::all(&proxy.url)
                .map_err(|e| DeliveryError::Client(format!("proxy {}: {}", proxy.url, e)))?;
            if let Some(username) = proxy.username.as_deref().filter(|u| !u.trim().is_empty()) {
                info!(user = %username, "Using proxy authentication");
                p = p.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(p);
        }

        let client = builder.build().map_err(|e| DeliveryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            dry_run: config.dry_run,
        })
    }

    /// 发送通知到所有房间，每个房间一次 POST
    pub async fn deliver(&self, target: &WebhookTarget, payload: &NotificationPayload) -> DeliveryResult {
        let Some(endpoint) = &target.endpoint else {
            warn!(error = %DeliveryError::MissingEndpoint, "Notification not sent");
            return DeliveryResult::failed();
        };
        let url = endpoint.url();

        let rooms: Vec<Option<&str>> = if target.rooms.is_empty() {
            vec![None]
        } else {
            target.rooms.iter().map(|r| Some(r.as_str())).collect()
        };

        let mut deliveries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let body = payload.to_wire(room);

            let result = if self.dry_run {
                eprintln!(
                    "[DRY-RUN] Would post to {}: {}",
                    room.unwrap_or("<default>"),
                    serde_json::to_string(&body).unwrap_or_default()
                );
                SendResult::Skipped("dry-run".to_string())
            } else {
                match self.post(&url, &body).await {
                    Ok(()) => {
                        info!(room = room.unwrap_or("<default>"), "Posting succeeded");
                        SendResult::Sent
                    }
                    Err(e) => {
                        warn!(room = room.unwrap_or("<default>"), error = %e, "BearyChat post failed");
                        SendResult::Failed(e.to_string())
                    }
                }
            };

            deliveries.push(RoomDelivery {
                room: room.map(str::to_string),
                result,
            });
        }

        DeliveryResult::from_rooms(deliveries)
    }

    async fn post(&self, url: &str, body: &WirePayload) -> Result<(), DeliveryError> {
        debug!(url = %url, channel = ?body.channel, "Posting notification");

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status {
            code: status.as_u16(),
            body,
        })
    }
}

/// 绑定了目标的 webhook 渠道
#[derive(Debug)]
pub struct WebhookChannel {
    client: WebhookClient,
    target: WebhookTarget,
}

impl WebhookChannel {
    pub fn new(client: WebhookClient, target: WebhookTarget) -> Self {
        Self { client, target }
    }

    pub fn target(&self) -> &WebhookTarget {
        &self.target
    }
}

impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "bearychat"
    }

    async fn deliver(&self, payload: &NotificationPayload) -> DeliveryResult {
        self.client.deliver(&self.target, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_config_default() {
        let config = WebhookConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.proxy.is_none());
        assert!(!config.dry_run);
    }

    #[test]
    fn test_team_token_endpoint() {
        let endpoint = Endpoint::TeamToken {
            team_domain: "acme".to_string(),
            token: "abc123".to_string(),
        };
        assert_eq!(endpoint.url(), "https://acme.bearychat.com/api/hooks/jenkins/abc123");
        assert_eq!(Endpoint::Url("https://hook/x".to_string()).url(), "https://hook/x");
    }

    #[test]
    fn test_parse_rooms() {
        assert_eq!(WebhookTarget::parse_rooms("room-a, room-b,,"), vec!["room-a", "room-b"]);
        assert!(WebhookTarget::parse_rooms("  ").is_empty());
    }

    #[test]
    fn test_proxy_with_credentials() {
        let config = WebhookConfig {
            proxy: Some(ProxyConfig {
                url: "http://proxy.internal:3128".to_string(),
                username: Some("ci".to_string()),
                password: Some("secret".to_string()),
            }),
            ..Default::default()
        };
        assert!(WebhookClient::new(config).is_ok());
    }

    #[test]
    fn test_status_error_message() {
        let err = DeliveryError::Status {
            code: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "webhook returned 500: boom");
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails_without_request() {
        let client = WebhookClient::new(WebhookConfig::default()).unwrap();
        let payload = NotificationPayload::new("t", "f", "b", "#808080");
        let result = client.deliver(&WebhookTarget::default(), &payload).await;
        assert!(!result.success);
        assert_eq!(result.attempts(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_every_room() {
        let client = WebhookClient::new(WebhookConfig {
            dry_run: true,
            ..Default::default()
        })
        .unwrap();
        let target = WebhookTarget::new(Endpoint::Url("http://127.0.0.1:9/hook".to_string()))
            .with_rooms(["a", "b"]);
        let payload = NotificationPayload::new("t", "f", "b", "#808080");

        let result = client.deliver(&target, &payload).await;
        assert!(result.success);
        assert_eq!(result.rooms.len(), 2);
        assert_eq!(result.attempts(), 0);
    }
}
