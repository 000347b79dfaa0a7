//! Payload 模块 - 通知内容与 BearyChat 传输格式
//!
//! 请求体格式（`application/json`）：
//! ```json
//! {
//!   "text": "Backend - #42 Back to normal after 2 hr 5 min",
//!   "fallback": "Backend - #42 Back to normal after 2 hr 5 min",
//!   "channel": "room-a",
//!   "markdown": true,
//!   "attachments": [
//!     { "title": "...", "text": "- fix login [alice]", "color": "#0080FF", "url": "https://ci/job/backend/42" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// 一次事件生成的通知内容，构造后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub fallback_text: String,
    pub body_text: String,
    pub color_tag: String,
    /// 构建页面链接
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 附件标题，缺省与 `title` 相同
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_title: Option<String>,
}

impl NotificationPayload {
    pub fn new(
        title: impl Into<String>,
        fallback_text: impl Into<String>,
        body_text: impl Into<String>,
        color_tag: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            fallback_text: fallback_text.into(),
            body_text: body_text.into(),
            color_tag: color_tag.into(),
            url: None,
            attachment_title: None,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_attachment_title(mut self, title: Option<String>) -> Self {
        self.attachment_title = title;
        self
    }

    /// 转换为发往某个房间的请求体
    pub fn to_wire(&self, channel: Option<&str>) -> WirePayload {
        WirePayload {
            text: self.title.clone(),
            fallback: self.fallback_text.clone(),
            channel: channel.map(str::to_string),
            markdown: true,
            attachments: vec![WireAttachment {
                title: Some(self.attachment_title.clone().unwrap_or_else(|| self.title.clone())),
                text: Some(self.body_text.clone()).filter(|t| !t.is_empty()),
                color: Some(self.color_tag.clone()),
                url: self.url.clone(),
            }],
        }
    }
}

/// Webhook 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePayload {
    pub text: String,
    pub fallback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub markdown: bool,
    pub attachments: Vec<WireAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
