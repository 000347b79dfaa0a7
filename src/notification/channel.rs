//! 通知渠道 trait 定义

use std::future::Future;

use super::payload::NotificationPayload;

/// 单个房间的发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（dry-run）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

impl SendResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, SendResult::Failed(_))
    }
}

/// 某个房间的投递记录
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDelivery {
    /// 房间 ID；`None` 表示使用 webhook 默认频道
    pub room: Option<String>,
    pub result: SendResult,
}

/// 一次通知的整体投递结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryResult {
    /// 所有房间都成功时为 true
    pub success: bool,
    pub rooms: Vec<RoomDelivery>,
}

impl DeliveryResult {
    /// 未做任何尝试即失败（如缺少 webhook 配置）
    pub fn failed() -> Self {
        Self {
            success: false,
            rooms: Vec::new(),
        }
    }

    pub fn from_rooms(rooms: Vec<RoomDelivery>) -> Self {
        let success = !rooms.is_empty() && rooms.iter().all(|r| !r.result.is_failed());
        Self { success, rooms }
    }

    /// 实际发起的请求数
    pub fn attempts(&self) -> usize {
        self.rooms
            .iter()
            .filter(|r| !matches!(r.result, SendResult::Skipped(_)))
            .count()
    }
}

/// 通知渠道 trait
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 投递通知；失败只体现在返回值中，不返回错误
    fn deliver(&self, payload: &NotificationPayload) -> impl Future<Output = DeliveryResult> + Send;
}
