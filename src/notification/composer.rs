//! 消息组装模块 - 将构建信息转换为通知内容
//!
//! 主要功能：
//! - 开始 / 完成两类事件的标题、摘要与正文
//! - 提交摘要（最多 5 条，超出部分显示 "N more..."）
//! - 空变更集时沿上游构建查找提交
//! - 自定义消息的环境变量展开
//!
//! 所有自由文本字段（项目名、构建名、提交信息、作者、自定义消息）
//! 在放入消息时转义一次，组装后的整体消息不再转义。

use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::payload::NotificationPayload;
use super::time_span::format_time_span;
use crate::build::{BuildHistory, BuildRecord, ChangeEntry, ProjectRecord, ResultKind};
use crate::gate::NotificationPolicy;
use crate::status::{classify_build, color, StatusLabel};

/// 提交摘要最多显示的条数
pub const MAX_COMMIT_MESSAGES: usize = 5;

/// 上游构建最多追溯的层数
pub const MAX_UPSTREAM_DEPTH: usize = 16;

pub const NO_COMMIT_CHANGES: &str = "No Commit Changes";

/// 转义 `&`、`<`、`>`
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 展开 `$VAR` 与 `${VAR}`，未定义的变量保持原样
pub fn expand_env(template: &str, env: &BTreeMap<String, String>) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
    });

    pattern
        .replace_all(template, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match env.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// 变更集摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// 作者（原始文本）
    pub authors: BTreeSet<String>,
    /// 涉及的不同文件数
    pub changed_file_count: usize,
    /// 已转义的提交行 `- {message} [{author}]`，最新在前
    pub commit_lines: Vec<String>,
    /// 未显示的提交数
    pub truncated_count: usize,
}

impl ChangeSummary {
    pub fn from_entries(entries: &[ChangeEntry]) -> Self {
        let authors: BTreeSet<String> = entries.iter().map(|e| e.author.clone()).collect();
        let files: BTreeSet<&str> = entries
            .iter()
            .flat_map(|e| e.affected_paths.iter().map(String::as_str))
            .collect();
        let commit_lines = entries
            .iter()
            .take(MAX_COMMIT_MESSAGES)
            .map(|e| format!("- {} [{}]", escape(&e.message), escape(&e.author)))
            .collect();

        Self {
            authors,
            changed_file_count: files.len(),
            commit_lines,
            truncated_count: entries.len().saturating_sub(MAX_COMMIT_MESSAGES),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commit_lines.is_empty()
    }

    pub fn truncated(&self) -> bool {
        self.truncated_count > 0
    }

    /// 已转义的作者列表
    pub fn authors_joined(&self) -> String {
        self.authors
            .iter()
            .map(|a| escape(a))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn render_commits(&self) -> String {
        let mut lines = self.commit_lines.clone();
        if self.truncated() {
            lines.push(format!("{} more...", self.truncated_count));
        }
        lines.join("\n")
    }
}

/// 消息组装器
pub struct MessageComposer<'a, H: BuildHistory + ?Sized> {
    history: &'a H,
    policy: &'a NotificationPolicy,
    server_url: Option<&'a str>,
}

impl<'a, H: BuildHistory + ?Sized> MessageComposer<'a, H> {
    pub fn new(history: &'a H, policy: &'a NotificationPolicy) -> Self {
        Self {
            history,
            policy,
            server_url: None,
        }
    }

    /// 设置 CI 服务地址（项目没有绝对 URL 时用于拼接构建链接）
    pub fn with_server_url(mut self, server_url: Option<&'a str>) -> Self {
        self.server_url = server_url;
        self
    }

    /// 组装开始事件
    pub fn compose_started(&self, project: &ProjectRecord, build: &BuildRecord) -> NotificationPayload {
        let header = Self::header(project, build);
        let changes = build
            .change_set
            .as_deref()
            .map(ChangeSummary::from_entries)
            .filter(|summary| !summary.is_empty());

        let detail = match (&changes, &build.cause_description) {
            (Some(summary), _) => format!(
                "Started by changes from {} ({} file(s) changed)",
                summary.authors_joined(),
                summary.changed_file_count
            ),
            (None, Some(cause)) if !cause.trim().is_empty() => escape(cause),
            _ => self.status_line(project, build, StatusLabel::Starting),
        };

        let has_cause = build.cause_description.as_deref().is_some_and(|c| !c.trim().is_empty());
        let fallback = match &changes {
            Some(summary) => format!("{} {} by {}", header, StatusLabel::Starting, summary.authors_joined()),
            None if has_cause => format!("{} {}", header, detail),
            None => format!("{} {}", header, StatusLabel::Starting),
        };

        let mut body = Vec::new();
        if let Some(custom) = self.custom_message(project, build, self.policy.custom_start_message.as_deref()) {
            body.push(custom);
        }
        match &changes {
            Some(summary) => body.push(format!(
                "{} file(s) changed - {}",
                summary.changed_file_count,
                summary.authors_joined()
            )),
            None => body.push(detail.clone()),
        }

        // 只看紧邻的上一次构建，不跳过中止的构建
        let previous = project.previous_builds(build.number).first().map(|b| b.outcome.result);
        let color = if previous == Some(ResultKind::Failure) {
            color::RED
        } else {
            color::GREEN
        };

        NotificationPayload::new(format!("{} {}", header, detail), fallback, body.join("\n"), color)
            .with_url(project.build_url(build.number, self.server_url))
    }

    /// 组装完成事件
    pub fn compose_completed(&self, project: &ProjectRecord, build: &BuildRecord) -> NotificationPayload {
        let status = classify_build(project, build);
        let title = format!("{} {}", Self::header(project, build), self.status_line(project, build, status));

        let mut body = Vec::new();
        if let Some(custom) = self.custom_message(project, build, self.policy.custom_end_message.as_deref()) {
            body.push(custom);
        }
        body.push(self.commit_summary(project, build));

        NotificationPayload::new(title.clone(), title, body.join("\n"), status.color())
            .with_url(project.build_url(build.number, self.server_url))
    }

    /// `{status} after {duration}`
    pub fn status_line(&self, project: &ProjectRecord, build: &BuildRecord, status: StatusLabel) -> String {
        format!(
            "{} after {}",
            escape(status.as_str()),
            format_time_span(Self::duration_millis(project, build, status))
        )
    }

    /// 恢复正常时为距上次成功构建结束的时长，否则为构建自身耗时
    pub fn duration_millis(project: &ProjectRecord, build: &BuildRecord, status: StatusLabel) -> u64 {
        if status != StatusLabel::BackToNormal {
            return build.outcome.duration_millis;
        }
        match project.previous_successful_build(build.number) {
            Some(last_success) => {
                let broken_for = build
                    .outcome
                    .end_time_millis()
                    .saturating_sub(last_success.outcome.end_time_millis());
                u64::try_from(broken_for).unwrap_or(0)
            }
            None => build.outcome.duration_millis,
        }
    }

    /// 提交摘要；空变更集时沿上游构建查找
    pub fn commit_summary(&self, project: &ProjectRecord, build: &BuildRecord) -> String {
        let mut visited: HashSet<(String, u32)> = HashSet::new();
        visited.insert((project.name.clone(), build.number));
        let mut current = build;

        loop {
            let summary = ChangeSummary::from_entries(current.changes());
            if !summary.is_empty() {
                return summary.render_commits();
            }

            let Some(cause) = &current.upstream else {
                return NO_COMMIT_CHANGES.to_string();
            };

            if visited.len() > MAX_UPSTREAM_DEPTH || !visited.insert((cause.project.clone(), cause.build)) {
                warn!(
                    project = %cause.project,
                    build = cause.build,
                    "Upstream cause chain loops or is too deep"
                );
                return NO_COMMIT_CHANGES.to_string();
            }

            match self.history.find_build(&cause.project, cause.build) {
                Some((_, upstream)) => {
                    debug!(project = %cause.project, build = cause.build, "Following upstream build for commits");
                    current = upstream;
                }
                None => {
                    debug!(project = %cause.project, build = cause.build, "Upstream build not found");
                    return NO_COMMIT_CHANGES.to_string();
                }
            }
        }
    }

    /// 展开并转义自定义消息；未启用或为空时返回 None
    pub fn custom_message(
        &self,
        project: &ProjectRecord,
        build: &BuildRecord,
        template: Option<&str>,
    ) -> Option<String> {
        if !self.policy.include_custom_message {
            return None;
        }
        let template = template.filter(|t| !t.trim().is_empty())?;

        let expanded = match self.history.environment(project, build) {
            Ok(env) => expand_env(template, &env),
            Err(e) => {
                warn!(error = %e, "Failed to expand custom message, using template as-is");
                template.to_string()
            }
        };
        Some(escape(&expanded))
    }

    fn header(project: &ProjectRecord, build: &BuildRecord) -> String {
        format!("{} - {}", escape(project.display_name()), escape(&build.display_name()))
    }
}
