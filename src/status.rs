//! 构建状态分类 - 根据构建及其历史得出通知中显示的状态
//!
//! 被中止的构建不参与"上一次结果"的判断，
//! 因此 失败 → 中止 → 成功 仍显示为 "Back to normal"。

use crate::build::{BuildOutcome, BuildRecord, ProjectRecord, ResultKind};

/// 附件颜色
pub mod color {
    pub const GREEN: &str = "#008800";
    pub const RED: &str = "#FF0000";
    pub const YELLOW: &str = "#FFFF00";
    pub const BLUE: &str = "#0080FF";
    pub const GREY: &str = "#808080";
}

/// 构建的显示状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Starting,
    BackToNormal,
    StillFailing,
    Success,
    Failure,
    Aborted,
    NotBuilt,
    Unstable,
    Unknown,
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Starting => "Starting",
            StatusLabel::BackToNormal => "Back to normal",
            StatusLabel::StillFailing => "Still Failing",
            StatusLabel::Success => "Success",
            StatusLabel::Failure => "Failure",
            StatusLabel::Aborted => "Aborted",
            StatusLabel::NotBuilt => "Not built",
            StatusLabel::Unstable => "Unstable",
            StatusLabel::Unknown => "Unknown",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            StatusLabel::Success | StatusLabel::BackToNormal => color::BLUE,
            StatusLabel::Failure | StatusLabel::StillFailing => color::RED,
            StatusLabel::Unstable => color::YELLOW,
            StatusLabel::Starting => color::GREEN,
            StatusLabel::Aborted | StatusLabel::NotBuilt | StatusLabel::Unknown => color::GREY,
        }
    }
}

/// 最近一次未被中止的历史构建结果；没有则视为 `Success`
pub fn effective_previous<'a, I>(previous: I) -> ResultKind
where
    I: IntoIterator<Item = &'a BuildOutcome>,
{
    previous
        .into_iter()
        .map(|outcome| outcome.result)
        .find(|result| *result != ResultKind::Aborted)
        .unwrap_or(ResultKind::Success)
}

/// 分类当前构建；`previous` 按新到旧排列，`previous_successful` 为最近一次成功构建
pub fn classify<'a, I>(
    current: &BuildOutcome,
    previous: I,
    previous_successful: Option<&BuildOutcome>,
) -> StatusLabel
where
    I: IntoIterator<Item = &'a BuildOutcome>,
{
    if current.building {
        return StatusLabel::Starting;
    }

    let previous_result = effective_previous(previous);
    let was_broken = matches!(previous_result, ResultKind::Failure | ResultKind::Unstable);

    match current.result {
        ResultKind::Success if was_broken && previous_successful.is_some() => StatusLabel::BackToNormal,
        ResultKind::Failure if previous_result == ResultKind::Failure => StatusLabel::StillFailing,
        ResultKind::Success => StatusLabel::Success,
        ResultKind::Failure => StatusLabel::Failure,
        ResultKind::Aborted => StatusLabel::Aborted,
        ResultKind::NotBuilt => StatusLabel::NotBuilt,
        ResultKind::Unstable => StatusLabel::Unstable,
        ResultKind::InProgress => StatusLabel::Unknown,
    }
}

/// 构建在所属项目中的有效上一次结果
pub fn effective_previous_of(project: &ProjectRecord, build: &BuildRecord) -> ResultKind {
    effective_previous(
        project
            .previous_builds(build.number)
            .into_iter()
            .map(|b| &b.outcome),
    )
}

/// 使用项目历史分类构建
pub fn classify_build(project: &ProjectRecord, build: &BuildRecord) -> StatusLabel {
    let previous_successful = project
        .previous_successful_build(build.number)
        .map(|b| &b.outcome);
    classify(
        &build.outcome,
        project
            .previous_builds(build.number)
            .into_iter()
            .map(|b| &b.outcome),
        previous_successful,
    )
}
