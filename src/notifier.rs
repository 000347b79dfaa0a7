//! 构建生命周期入口
//!
//! 每个事件依次执行：分类 → 开关判断 → 组装消息 → 投递。
//! 投递在入口内 await 完成，入口返回时通知已经发出（或已确定失败）。

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info, warn};

use crate::build::{BuildHistory, BuildRecord, ProjectRecord, ResultKind};
use crate::gate::{should_notify, should_notify_start, NotificationPolicy};
use crate::notification::{DeliveryResult, MessageComposer, NotificationChannel, NotificationPayload};
use crate::status::{classify_build, effective_previous, StatusLabel};

/// 一次事件的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// 开关未启用，未发送
    Skipped,
    /// 已尝试投递
    Delivered {
        status: StatusLabel,
        result: DeliveryResult,
    },
}

impl NotifyOutcome {
    pub fn delivery(&self) -> Option<&DeliveryResult> {
        match self {
            NotifyOutcome::Skipped => None,
            NotifyOutcome::Delivered { result, .. } => Some(result),
        }
    }
}

/// 开关判断使用的上一次结果：跳过中止和仍在运行的构建
fn previous_completed_result(project: &ProjectRecord, build: &BuildRecord) -> ResultKind {
    effective_previous(
        project
            .previous_builds(build.number)
            .into_iter()
            .map(|b| &b.outcome)
            .filter(|outcome| !outcome.building && outcome.result.is_completed()),
    )
}

/// 构建通知器
pub struct BuildNotifier<C: NotificationChannel> {
    channel: C,
    policy: NotificationPolicy,
    server_url: Option<String>,
    fail_on_error: bool,
}

impl<C: NotificationChannel> BuildNotifier<C> {
    pub fn new(channel: C, policy: NotificationPolicy) -> Self {
        Self {
            channel,
            policy,
            server_url: None,
            fail_on_error: false,
        }
    }

    pub fn with_server_url(mut self, server_url: Option<String>) -> Self {
        self.server_url = server_url;
        self
    }

    /// 投递失败时返回错误而不是只记录日志
    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    /// 构建开始
    pub async fn on_started<H>(&self, history: &H, project: &str, number: u32) -> Result<NotifyOutcome>
    where
        H: BuildHistory + ?Sized,
    {
        let (project, build) = history
            .find_build(project, number)
            .ok_or_else(|| anyhow!("Build {} #{} not found", project, number))?;

        if !should_notify_start(&self.policy) {
            debug!(project = %project.name, build = number, "Start notification disabled");
            return Ok(NotifyOutcome::Skipped);
        }

        let payload = MessageComposer::new(history, &self.policy)
            .with_server_url(self.server_url.as_deref())
            .compose_started(project, build);
        self.deliver(&project.name, number, StatusLabel::Starting, &payload).await
    }

    /// 构建完成
    pub async fn on_completed<H>(&self, history: &H, project: &str, number: u32) -> Result<NotifyOutcome>
    where
        H: BuildHistory + ?Sized,
    {
        let (project, build) = history
            .find_build(project, number)
            .ok_or_else(|| anyhow!("Build {} #{} not found", project, number))?;

        if build.outcome.building || !build.outcome.result.is_completed() {
            warn!(project = %project.name, build = number, "Build has not completed yet");
            return Ok(NotifyOutcome::Skipped);
        }

        let previous = previous_completed_result(project, build);
        if !should_notify(build.outcome.result, previous, &self.policy) {
            debug!(
                project = %project.name,
                build = number,
                result = %build.outcome.result,
                previous = %previous,
                "Notification disabled for this result"
            );
            return Ok(NotifyOutcome::Skipped);
        }

        let status = classify_build(project, build);
        let payload = MessageComposer::new(history, &self.policy)
            .with_server_url(self.server_url.as_deref())
            .compose_completed(project, build);
        self.deliver(&project.name, number, status, &payload).await
    }

    async fn deliver(
        &self,
        project: &str,
        number: u32,
        status: StatusLabel,
        payload: &NotificationPayload,
    ) -> Result<NotifyOutcome> {
        let result = self.channel.deliver(payload).await;

        if result.success {
            info!(
                channel = self.channel.name(),
                project,
                build = number,
                status = %status,
                attempts = result.attempts(),
                "Notification delivered"
            );
        } else {
            warn!(
                channel = self.channel.name(),
                project,
                build = number,
                status = %status,
                "Notification failed"
            );
            if self.fail_on_error {
                bail!("Notification failed");
            }
        }

        Ok(NotifyOutcome::Delivered { status, result })
    }
}
