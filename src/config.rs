//! 配置模块 - 加载通知器配置
//!
//! 加载顺序：
//! 1. `--config PATH` 指定的文件
//! 2. `~/.config/build-notifier/config.json`
//! 3. 环境变量 `BUILD_NOTIFIER_WEBHOOK_URL` / `BUILD_NOTIFIER_CHANNEL` / `BUILD_NOTIFIER_SERVER_URL`
//!    （只补充文件中缺失的字段）
//!
//! 示例：
//! ```json
//! {
//!   "webhook": "https://hook.bearychat.com/=bw8NI/incoming/abc",
//!   "channel": "ci,ops",
//!   "build_server_url": "https://ci.example.com/",
//!   "policy": { "events": { "started": true } },
//!   "jobs": {
//!     "backend": { "channel": "backend-${BRANCH}" }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::gate::NotificationPolicy;
use crate::notification::composer::expand_env;
use crate::notification::webhook::{Endpoint, ProxyConfig, WebhookConfig, WebhookTarget};

pub const ENV_WEBHOOK_URL: &str = "BUILD_NOTIFIER_WEBHOOK_URL";
pub const ENV_CHANNEL: &str = "BUILD_NOTIFIER_CHANNEL";
pub const ENV_SERVER_URL: &str = "BUILD_NOTIFIER_SERVER_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 单个 job 的覆盖配置，优先于全局配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub webhook: Option<String>,
    pub channel: Option<String>,
    pub policy: Option<NotificationPolicy>,
}

/// 通知器全局配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// 完整的 incoming webhook URL
    pub webhook: Option<String>,
    /// 旧版配置：team domain + token
    pub team_domain: Option<String>,
    pub token: Option<String>,
    /// 逗号分隔的房间 ID
    pub channel: Option<String>,
    /// CI 服务器根地址，用于拼接构建链接
    pub build_server_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<ProxyConfig>,
    pub policy: NotificationPolicy,
    pub jobs: BTreeMap<String, JobConfig>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl NotifierConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/build-notifier/config.json"))
    }

    /// 从指定文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// 按优先级加载配置，最后用环境变量补全
    pub fn auto_load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!(path = %path.display(), "Loading config");
                    Self::load(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 用环境变量填充缺失字段
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut Option<String>, key: &str| {
            if non_empty(slot.as_deref()).is_none() {
                if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                    debug!(key, "Using value from environment");
                    *slot = Some(value);
                }
            }
        };
        fill(&mut self.webhook, ENV_WEBHOOK_URL);
        fill(&mut self.channel, ENV_CHANNEL);
        fill(&mut self.build_server_url, ENV_SERVER_URL);
    }

    /// 服务器地址，保证以 `/` 结尾
    pub fn server_url(&self) -> Option<String> {
        non_empty(self.build_server_url.as_deref()).map(|url| {
            if url.ends_with('/') {
                url.to_string()
            } else {
                format!("{}/", url)
            }
        })
    }

    /// job 生效的通知策略
    pub fn policy_for(&self, project: &str) -> NotificationPolicy {
        self.jobs
            .get(project)
            .and_then(|job| job.policy.clone())
            .unwrap_or_else(|| self.policy.clone())
    }

    /// 解析 webhook 地址；完整 URL 优先于 team domain + token
    pub fn endpoint(&self, webhook_override: Option<&str>) -> Option<Endpoint> {
        if let Some(url) = non_empty(webhook_override).or(non_empty(self.webhook.as_deref())) {
            return Some(Endpoint::Url(url.to_string()));
        }
        match (non_empty(self.team_domain.as_deref()), non_empty(self.token.as_deref())) {
            (Some(team_domain), Some(token)) => Some(Endpoint::TeamToken {
                team_domain: team_domain.to_string(),
                token: token.to_string(),
            }),
            _ => None,
        }
    }

    /// 计算投递目标：job 覆盖 > 全局配置，webhook 和 channel 会用构建环境变量展开
    pub fn target_for(&self, project: Option<&str>, env: &BTreeMap<String, String>) -> WebhookTarget {
        let job = project.and_then(|p| self.jobs.get(p));
        let webhook = job
            .and_then(|j| non_empty(j.webhook.as_deref()))
            .map(|w| expand_env(w, env));
        let channel = job
            .and_then(|j| non_empty(j.channel.as_deref()))
            .or(non_empty(self.channel.as_deref()))
            .map(|c| expand_env(c, env));

        let endpoint = match webhook {
            Some(url) => Some(Endpoint::Url(url)),
            None => match self.endpoint(None) {
                Some(Endpoint::Url(url)) => Some(Endpoint::Url(expand_env(&url, env))),
                other => other,
            },
        };

        WebhookTarget {
            endpoint,
            rooms: channel.map(|c| WebhookTarget::parse_rooms(&c)).unwrap_or_default(),
        }
    }

    pub fn webhook_config(&self, dry_run: bool) -> WebhookConfig {
        WebhookConfig {
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            proxy: self.proxy.clone(),
            dry_run,
        }
    }
}
