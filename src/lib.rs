//! Build Notifier - 把 CI 构建事件推送到 BearyChat

pub mod build;
pub mod cli;
pub mod config;
pub mod gate;
pub mod notification;
pub mod notifier;
pub mod status;

pub use build::{
    BuildHistory, BuildOutcome, BuildRecord, ChangeEntry, HistorySnapshot, ProjectRecord, ResultKind, UpstreamCause,
};
pub use config::{JobConfig, NotifierConfig};
pub use gate::{should_notify, should_notify_start, EventKind, EventToggles, NotificationPolicy};
pub use notification::{
    DeliveryResult, MessageComposer, NotificationChannel, NotificationPayload, SendRequest, SendResult,
    WebhookChannel, WebhookClient, WebhookConfig, WebhookTarget,
};
pub use notifier::{BuildNotifier, NotifyOutcome};
pub use status::{classify, classify_build, effective_previous, StatusLabel};
