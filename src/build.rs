//! 构建历史模型 - 通知所需的只读构建快照
//!
//! 所有数据都是一次事件内计算、用完即弃的值对象。宿主 CI 通过实现
//! [`BuildHistory`] 提供数据；CLI 使用 [`HistorySnapshot`]（JSON 快照）。
//!
//! 快照格式：
//! ```json
//! {
//!   "projects": [{
//!     "name": "backend",
//!     "display_name": "Backend",
//!     "url": "https://ci.example.com/job/backend/",
//!     "builds": [{
//!       "number": 42,
//!       "display_name": "#42",
//!       "outcome": { "result": "SUCCESS", "duration_millis": 65000, "start_time_millis": 1700000000000 },
//!       "change_set": [{ "message": "fix", "author": "alice", "affected_paths": ["src/lib.rs"] }],
//!       "environment": { "BRANCH": "main" }
//!     }]
//!   }]
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// 构建结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultKind {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    InProgress,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Success => "SUCCESS",
            ResultKind::Failure => "FAILURE",
            ResultKind::Unstable => "UNSTABLE",
            ResultKind::Aborted => "ABORTED",
            ResultKind::NotBuilt => "NOT_BUILT",
            ResultKind::InProgress => "IN_PROGRESS",
        }
    }

    /// 已结束的构建（有最终结果）
    pub fn is_completed(&self) -> bool {
        !matches!(self, ResultKind::InProgress)
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单次构建的结果快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub result: ResultKind,
    #[serde(default)]
    pub duration_millis: u64,
    #[serde(default)]
    pub start_time_millis: i64,
    /// 构建是否仍在进行
    #[serde(default)]
    pub building: bool,
}

impl BuildOutcome {
    pub fn new(result: ResultKind) -> Self {
        Self {
            result,
            duration_millis: 0,
            start_time_millis: 0,
            building: false,
        }
    }

    /// 进行中的构建
    pub fn in_progress(start_time_millis: i64) -> Self {
        Self {
            result: ResultKind::InProgress,
            duration_millis: 0,
            start_time_millis,
            building: true,
        }
    }

    pub fn with_timing(mut self, start_time_millis: i64, duration_millis: u64) -> Self {
        self.start_time_millis = start_time_millis;
        self.duration_millis = duration_millis;
        self
    }

    pub fn end_time_millis(&self) -> i64 {
        self.start_time_millis
            .saturating_add(i64::try_from(self.duration_millis).unwrap_or(i64::MAX))
    }
}

/// 变更集中的一条提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub message: String,
    pub author: String,
    #[serde(default)]
    pub affected_paths: Vec<String>,
}

impl ChangeEntry {
    pub fn new(message: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            author: author.into(),
            affected_paths: Vec::new(),
        }
    }

    pub fn with_paths(mut self, paths: &[&str]) -> Self {
        self.affected_paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// 由上游构建触发
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpstreamCause {
    pub project: String,
    pub build: u32,
}

/// 构建记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    pub number: u32,
    #[serde(default)]
    pub display_name: Option<String>,
    pub outcome: BuildOutcome,
    /// 变更集，最新提交在前；`None` 表示尚未计算
    #[serde(default)]
    pub change_set: Option<Vec<ChangeEntry>>,
    #[serde(default)]
    pub upstream: Option<UpstreamCause>,
    /// 触发原因描述（如 "Started by user admin"）
    #[serde(default)]
    pub cause_description: Option<String>,
    /// 构建环境变量；`None` 表示无法获取
    #[serde(default)]
    pub environment: Option<BTreeMap<String, String>>,
}

impl BuildRecord {
    pub fn new(number: u32, outcome: BuildOutcome) -> Self {
        Self {
            number,
            display_name: None,
            outcome,
            change_set: None,
            upstream: None,
            cause_description: None,
            environment: None,
        }
    }

    pub fn with_change_set(mut self, entries: Vec<ChangeEntry>) -> Self {
        self.change_set = Some(entries);
        self
    }

    pub fn with_upstream(mut self, project: impl Into<String>, build: u32) -> Self {
        self.upstream = Some(UpstreamCause {
            project: project.into(),
            build,
        });
        self
    }

    pub fn with_cause(mut self, description: impl Into<String>) -> Self {
        self.cause_description = Some(description.into());
        self
    }

    pub fn with_environment(mut self, vars: &[(&str, &str)]) -> Self {
        self.environment = Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// 显示名，缺省为 `#<number>`
    pub fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("#{}", self.number))
    }

    /// 变更集是否已计算
    pub fn has_change_set_computed(&self) -> bool {
        self.change_set.is_some()
    }

    pub fn changes(&self) -> &[ChangeEntry] {
        self.change_set.as_deref().unwrap_or(&[])
    }
}

/// 项目及其构建历史
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// 项目绝对 URL
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub builds: Vec<BuildRecord>,
}

impl ProjectRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            url: None,
            builds: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_build(mut self, build: BuildRecord) -> Self {
        self.builds.push(build);
        self
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn build(&self, number: u32) -> Option<&BuildRecord> {
        self.builds.iter().find(|b| b.number == number)
    }

    /// 指定构建之前的所有构建，最新的在前
    pub fn previous_builds(&self, number: u32) -> Vec<&BuildRecord> {
        let mut previous: Vec<&BuildRecord> =
            self.builds.iter().filter(|b| b.number < number).collect();
        previous.sort_by(|a, b| b.number.cmp(&a.number));
        previous
    }

    /// 指定构建之前最近一次成功的构建
    pub fn previous_successful_build(&self, number: u32) -> Option<&BuildRecord> {
        self.previous_builds(number)
            .into_iter()
            .find(|b| b.outcome.result == ResultKind::Success)
    }

    /// 构建页面 URL（项目 URL + 构建号）
    pub fn build_url(&self, number: u32, server_url: Option<&str>) -> Option<String> {
        let base = match (&self.url, server_url) {
            (Some(url), _) => url.clone(),
            (None, Some(server)) => {
                format!("{}/job/{}", server.trim_end_matches('/'), self.name)
            }
            (None, None) => return None,
        };
        Some(format!("{}/{}", base.trim_end_matches('/'), number))
    }
}

/// 构建历史访问接口（由宿主注入，只读）
pub trait BuildHistory {
    /// 按全名查找项目
    fn project(&self, name: &str) -> Option<&ProjectRecord>;

    /// 获取构建环境变量
    fn environment(&self, project: &ProjectRecord, build: &BuildRecord) -> Result<BTreeMap<String, String>>;

    fn find_build(&self, project: &str, number: u32) -> Option<(&ProjectRecord, &BuildRecord)> {
        let project = self.project(project)?;
        let build = project.build(number)?;
        Some((project, build))
    }
}

/// 内存中的构建历史快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySnapshot {
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

impl HistorySnapshot {
    pub fn new(projects: Vec<ProjectRecord>) -> Self {
        Self { projects }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: HistorySnapshot =
            serde_json::from_str(content).context("Invalid build history snapshot")?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file {}", path.display()))?;
        Self::from_json(&content)
    }
}

impl BuildHistory for HistorySnapshot {
    fn project(&self, name: &str) -> Option<&ProjectRecord> {
        self.projects.iter().find(|p| p.name == name)
    }

    fn environment(&self, project: &ProjectRecord, build: &BuildRecord) -> Result<BTreeMap<String, String>> {
        build.environment.clone().ok_or_else(|| {
            anyhow!(
                "No environment captured for {} {}",
                project.name,
                build.display_name()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> ProjectRecord {
        ProjectRecord::new("backend")
            .with_build(BuildRecord::new(1, BuildOutcome::new(ResultKind::Success)))
            .with_build(BuildRecord::new(3, BuildOutcome::new(ResultKind::Failure)))
            .with_build(BuildRecord::new(2, BuildOutcome::new(ResultKind::Aborted)))
            .with_build(BuildRecord::new(4, BuildOutcome::in_progress(0)))
    }

    #[test]
    fn test_previous_builds_newest_first() {
        let project = sample_project();
        let numbers: Vec<u32> = project.previous_builds(4).iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert!(project.previous_builds(1).is_empty());
    }

    #[test]
    fn test_previous_successful_build() {
        let project = sample_project();
        assert_eq!(project.previous_successful_build(4).map(|b| b.number), Some(1));
        assert!(project.previous_successful_build(1).is_none());
    }

    #[test]
    fn test_end_time() {
        let outcome = BuildOutcome::new(ResultKind::Success).with_timing(1_000, 500);
        assert_eq!(outcome.end_time_millis(), 1_500);
    }

    #[test]
    fn test_build_url() {
        let project = ProjectRecord::new("backend").with_url("https://ci.example.com/job/backend/");
        assert_eq!(
            project.build_url(7, None).as_deref(),
            Some("https://ci.example.com/job/backend/7")
        );

        let bare = ProjectRecord::new("backend");
        assert_eq!(
            bare.build_url(7, Some("https://ci.example.com/")).as_deref(),
            Some("https://ci.example.com/job/backend/7")
        );
        assert!(bare.build_url(7, None).is_none());
    }

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{
            "projects": [{
                "name": "backend",
                "builds": [
                    {"number": 1, "outcome": {"result": "NOT_BUILT"}},
                    {"number": 2, "outcome": {"result": "IN_PROGRESS", "building": true},
                     "environment": {"BRANCH": "main"}}
                ]
            }]
        }"#;
        let snapshot = HistorySnapshot::from_json(json).unwrap();
        let (project, build) = snapshot.find_build("backend", 2).unwrap();
        assert!(build.outcome.building);
        assert_eq!(project.display_name(), "backend");
        assert_eq!(build.display_name(), "#2");

        let env = snapshot.environment(project, build).unwrap();
        assert_eq!(env.get("BRANCH").map(String::as_str), Some("main"));

        let (_, first) = snapshot.find_build("backend", 1).unwrap();
        assert_eq!(first.outcome.result, ResultKind::NotBuilt);
        assert!(snapshot.environment(project, first).is_err());
        assert!(snapshot.find_build("missing", 1).is_none());
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(HistorySnapshot::from_json("not json").is_err());
    }
}
