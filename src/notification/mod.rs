//! 通知层 - 组装构建通知并投递到 BearyChat
//!
//! # 组成
//! 1. `composer`：根据构建历史生成 `NotificationPayload`
//! 2. `payload`：通知内容与 webhook 请求体
//! 3. `webhook`：逐房间 POST，失败只记录不抛出
//! 4. `send`：不依赖构建历史的自由格式发送
//!
//! # 使用示例
//! ```ignore
//! use build_notifier::notification::{WebhookClient, WebhookConfig, WebhookTarget, Endpoint};
//!
//! let client = WebhookClient::new(WebhookConfig::default())?;
//! let target = WebhookTarget::new(Endpoint::Url(url)).with_rooms(["ci"]);
//! let result = client.deliver(&target, &payload).await;
//! ```

pub mod channel;
pub mod composer;
pub mod payload;
pub mod send;
pub mod time_span;
pub mod webhook;

pub use channel::{DeliveryResult, NotificationChannel, RoomDelivery, SendResult};
pub use composer::{escape, expand_env, ChangeSummary, MessageComposer};
pub use payload::{NotificationPayload, WireAttachment, WirePayload};
pub use send::SendRequest;
pub use time_span::format_time_span;
pub use webhook::{DeliveryError, Endpoint, ProxyConfig, WebhookChannel, WebhookClient, WebhookConfig, WebhookTarget};
