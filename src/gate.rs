//! 通知开关 - 决定一次构建事件是否需要发送通知
//!
//! 规则（每个开关独立生效）：
//! - ABORTED    → `aborted`
//! - FAILURE    → `failure`（首次失败与持续失败同样处理）
//! - NOT_BUILT  → `not_built`
//! - SUCCESS 且上次为 FAILURE/UNSTABLE → `back_to_normal` 或 `success`
//! - SUCCESS    → `success`
//! - UNSTABLE   → `unstable`
//! - 开始构建   → `started`（仅在 started 事件上判断）

use serde::{Deserialize, Serialize};

use crate::build::ResultKind;

/// 可单独开关的通知事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    Success,
    Failure,
    Aborted,
    NotBuilt,
    Unstable,
    BackToNormal,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Started,
        EventKind::Success,
        EventKind::Failure,
        EventKind::Aborted,
        EventKind::NotBuilt,
        EventKind::Unstable,
        EventKind::BackToNormal,
    ];
}

/// 每类事件的开关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventToggles {
    pub started: bool,
    pub success: bool,
    pub failure: bool,
    pub aborted: bool,
    pub not_built: bool,
    pub unstable: bool,
    pub back_to_normal: bool,
}

impl Default for EventToggles {
    fn default() -> Self {
        Self {
            started: false,
            success: false,
            failure: true,
            aborted: false,
            not_built: false,
            unstable: true,
            back_to_normal: true,
        }
    }
}

impl EventToggles {
    /// 全部关闭
    pub fn none() -> Self {
        Self {
            started: false,
            success: false,
            failure: false,
            aborted: false,
            not_built: false,
            unstable: false,
            back_to_normal: false,
        }
    }

    pub fn enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Started => self.started,
            EventKind::Success => self.success,
            EventKind::Failure => self.failure,
            EventKind::Aborted => self.aborted,
            EventKind::NotBuilt => self.not_built,
            EventKind::Unstable => self.unstable,
            EventKind::BackToNormal => self.back_to_normal,
        }
    }

    pub fn set(&mut self, kind: EventKind, enabled: bool) {
        let slot = match kind {
            EventKind::Started => &mut self.started,
            EventKind::Success => &mut self.success,
            EventKind::Failure => &mut self.failure,
            EventKind::Aborted => &mut self.aborted,
            EventKind::NotBuilt => &mut self.not_built,
            EventKind::Unstable => &mut self.unstable,
            EventKind::BackToNormal => &mut self.back_to_normal,
        };
        *slot = enabled;
    }

    pub fn with(mut self, kind: EventKind, enabled: bool) -> Self {
        self.set(kind, enabled);
        self
    }
}

/// 通知策略
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPolicy {
    pub events: EventToggles,
    /// 是否附带自定义消息
    pub include_custom_message: bool,
    pub custom_start_message: Option<String>,
    pub custom_end_message: Option<String>,
}

impl NotificationPolicy {
    pub fn new(events: EventToggles) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    pub fn with_custom_messages(
        mut self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Self {
        self.include_custom_message = true;
        self.custom_start_message = start.map(str::to_string);
        self.custom_end_message = end.map(str::to_string);
        self
    }
}

/// 完成事件可能触发的开关（成功恢复时返回两个）
pub fn completion_events(current: ResultKind, effective_previous: ResultKind) -> &'static [EventKind] {
    match current {
        ResultKind::Aborted => &[EventKind::Aborted],
        ResultKind::Failure => &[EventKind::Failure],
        ResultKind::NotBuilt => &[EventKind::NotBuilt],
        ResultKind::Unstable => &[EventKind::Unstable],
        ResultKind::Success
            if matches!(effective_previous, ResultKind::Failure | ResultKind::Unstable) =>
        {
            &[EventKind::BackToNormal, EventKind::Success]
        }
        ResultKind::Success => &[EventKind::Success],
        ResultKind::InProgress => &[],
    }
}

/// 构建完成时是否发送通知
pub fn should_notify(current: ResultKind, effective_previous: ResultKind, policy: &NotificationPolicy) -> bool {
    completion_events(current, effective_previous)
        .iter()
        .any(|kind| policy.events.enabled(*kind))
}

/// 构建开始时是否发送通知
pub fn should_notify_start(policy: &NotificationPolicy) -> bool {
    policy.events.enabled(EventKind::Started)
}
