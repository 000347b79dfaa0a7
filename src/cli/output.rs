//! Output formatting for CLI commands

use serde::Serialize;

use crate::notification::{DeliveryResult, SendResult};
use crate::notifier::NotifyOutcome;

/// 单个房间的投递结果
#[derive(Debug, Serialize)]
pub struct RoomReport {
    pub room: Option<String>,
    /// sent / skipped / failed
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 一次命令的投递报告
#[derive(Debug, Serialize)]
pub struct DeliveryReport {
    pub delivered: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub attempts: usize,
    pub rooms: Vec<RoomReport>,
}

impl DeliveryReport {
    pub fn from_delivery(result: &DeliveryResult, status: Option<String>) -> Self {
        let rooms = result
            .rooms
            .iter()
            .map(|r| {
                let (result, detail) = match &r.result {
                    SendResult::Sent => ("sent", None),
                    SendResult::Skipped(reason) => ("skipped", Some(reason.clone())),
                    SendResult::Failed(reason) => ("failed", Some(reason.clone())),
                };
                RoomReport {
                    room: r.room.clone(),
                    result,
                    detail,
                }
            })
            .collect();

        Self {
            delivered: true,
            success: result.success,
            status,
            attempts: result.attempts(),
            rooms,
        }
    }

    pub fn from_outcome(outcome: &NotifyOutcome) -> Self {
        match outcome {
            NotifyOutcome::Skipped => Self {
                delivered: false,
                success: true,
                status: None,
                attempts: 0,
                rooms: Vec::new(),
            },
            NotifyOutcome::Delivered { status, result } => {
                Self::from_delivery(result, Some(status.to_string()))
            }
        }
    }

    /// 人类可读的一行摘要
    pub fn summary(&self) -> String {
        if !self.delivered {
            return "Notification skipped".to_string();
        }
        let status = self
            .status
            .as_deref()
            .map(|s| format!(" ({})", s))
            .unwrap_or_default();
        let failed = self.rooms.iter().filter(|r| r.result == "failed").count();
        if self.success {
            format!("Notification sent{} to {} room(s)", status, self.rooms.len())
        } else {
            format!("Notification failed{}: {}/{} room(s) failed", status, failed, self.rooms.len())
        }
    }
}

/// Format output as JSON or a one-line summary based on --json flag
pub fn format_output<T: Serialize>(data: &T, json: bool, summary: impl FnOnce() -> String) -> String {
    if json {
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RoomDelivery;

    #[test]
    fn test_report_from_partial_failure() {
        let result = DeliveryResult::from_rooms(vec![
            RoomDelivery {
                room: Some("a".to_string()),
                result: SendResult::Sent,
            },
            RoomDelivery {
                room: Some("b".to_string()),
                result: SendResult::Failed("webhook returned 500: boom".to_string()),
            },
        ]);
        let report = DeliveryReport::from_delivery(&result, Some("Failure".to_string()));

        assert!(!report.success);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.summary(), "Notification failed (Failure): 1/2 room(s) failed");

        let json: serde_json::Value = serde_json::from_str(&format_output(&report, true, String::new)).unwrap();
        assert_eq!(json["rooms"][1]["result"], "failed");
        assert!(json["rooms"][0].get("detail").is_none());
    }

    #[test]
    fn test_report_for_skipped_event() {
        let report = DeliveryReport::from_outcome(&NotifyOutcome::Skipped);
        assert!(!report.delivered);
        assert_eq!(format_output(&report, false, || report.summary()), "Notification skipped");
    }
}
