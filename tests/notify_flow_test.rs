//! 端到端流程测试：历史快照 → 分类 → 组装 → 投递

use build_notifier::notification::composer::NO_COMMIT_CHANGES;
use build_notifier::notification::Endpoint;
use build_notifier::status::color;
use build_notifier::{
    classify_build, BuildHistory, BuildNotifier, BuildOutcome, BuildRecord, ChangeEntry, HistorySnapshot,
    MessageComposer, NotificationPolicy, NotifierConfig, NotifyOutcome, ProjectRecord, ResultKind, StatusLabel,
    WebhookChannel, WebhookClient, WebhookConfig,
};
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOUR: u64 = 60 * 60 * 1000;
const MINUTE: u64 = 60 * 1000;

fn outcome(result: ResultKind, start: i64, duration: u64) -> BuildOutcome {
    BuildOutcome::new(result).with_timing(start, duration)
}

/// #39 成功，#40/#41 失败，#42 恢复
fn recovering_history() -> HistorySnapshot {
    let t39_end: i64 = 1_700_000_000_000;
    let t42_start = t39_end + (2 * HOUR + 5 * MINUTE) as i64 - 30_000;

    let project = ProjectRecord::new("backend")
        .with_url("https://ci.example.com/job/backend/")
        .with_build(BuildRecord::new(39, outcome(ResultKind::Success, t39_end - 60_000, 60_000)))
        .with_build(BuildRecord::new(40, outcome(ResultKind::Failure, t39_end + 600_000, 45_000)))
        .with_build(BuildRecord::new(41, outcome(ResultKind::Failure, t39_end + 1_200_000, 45_000)))
        .with_build(
            BuildRecord::new(42, outcome(ResultKind::Success, t42_start, 30_000))
                .with_change_set(vec![ChangeEntry::new("fix login", "alice").with_paths(&["src/login.rs"])]),
        );
    HistorySnapshot::new(vec![project])
}

#[test]
fn test_back_to_normal_uses_time_since_last_success() {
    let history = recovering_history();
    let (project, build) = history.find_build("backend", 42).unwrap();
    assert_eq!(classify_build(project, build), StatusLabel::BackToNormal);

    let policy = NotificationPolicy::default();
    let payload = MessageComposer::new(&history, &policy).compose_completed(project, build);

    assert_eq!(payload.title, "backend - #42 Back to normal after 2 hr 5 min");
    assert_eq!(payload.fallback_text, payload.title);
    assert_eq!(payload.color_tag, color::BLUE);
    assert_eq!(payload.body_text, "- fix login [alice]");
    assert_eq!(payload.url.as_deref(), Some("https://ci.example.com/job/backend/42"));
}

#[test]
fn test_commit_summary_follows_upstream_cause() {
    let upstream = ProjectRecord::new("upstream-job").with_build(
        BuildRecord::new(5, outcome(ResultKind::Success, 0, 1_000)).with_change_set(vec![
            ChangeEntry::new("bump api", "bob"),
            ChangeEntry::new("add endpoint", "carol"),
        ]),
    );
    let downstream = ProjectRecord::new("deploy").with_build(
        BuildRecord::new(8, outcome(ResultKind::Failure, 0, 1_000))
            .with_change_set(Vec::new())
            .with_upstream("upstream-job", 5),
    );
    let history = HistorySnapshot::new(vec![upstream, downstream]);
    let policy = NotificationPolicy::default();
    let composer = MessageComposer::new(&history, &policy);

    let (up_project, up_build) = history.find_build("upstream-job", 5).unwrap();
    let (project, build) = history.find_build("deploy", 8).unwrap();

    let summary = composer.commit_summary(project, build);
    assert_eq!(summary, "- bump api [bob]\n- add endpoint [carol]");
    assert_eq!(summary, composer.commit_summary(up_project, up_build));
}

#[test]
fn test_missing_upstream_has_no_commit_changes() {
    let project = ProjectRecord::new("deploy").with_build(
        BuildRecord::new(1, outcome(ResultKind::Success, 0, 1_000)).with_upstream("gone", 3),
    );
    let history = HistorySnapshot::new(vec![project]);
    let policy = NotificationPolicy::default();
    let (project, build) = history.find_build("deploy", 1).unwrap();

    assert_eq!(
        MessageComposer::new(&history, &policy).commit_summary(project, build),
        NO_COMMIT_CHANGES
    );
}

#[test]
fn test_display_names_are_escaped_once() {
    let mut project = ProjectRecord::new("ab")
        .with_build(BuildRecord::new(1, outcome(ResultKind::Failure, 0, 2_000)));
    project.display_name = Some("A & B <C>".to_string());
    let history = HistorySnapshot::new(vec![project]);
    let policy = NotificationPolicy::default();
    let (project, build) = history.find_build("ab", 1).unwrap();

    let payload = MessageComposer::new(&history, &policy).compose_completed(project, build);
    assert!(payload.title.starts_with("A &amp; B &lt;C&gt; - #1 Failure after"));
    assert!(!payload.title.contains("&amp;amp;"));
}

#[tokio::test]
async fn test_fan_out_reports_partial_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({ "channel": "room-a" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({ "channel": "room-b" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = WebhookClient::new(WebhookConfig::default()).unwrap();
    let target = build_notifier::WebhookTarget::new(Endpoint::Url(format!("{}/hook", server.uri())))
        .with_rooms(["room-a", "room-b"]);
    let notifier = BuildNotifier::new(WebhookChannel::new(client, target), NotificationPolicy::default());

    let outcome = notifier.on_completed(&recovering_history(), "backend", 41).await.unwrap();
    let result = outcome.delivery().unwrap();
    assert!(!result.success);
    assert_eq!(result.attempts(), 2);
    assert!(!result.rooms[0].result.is_failed());
    assert!(result.rooms[1].result.is_failed());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["text"], "backend - #41 Still Failing after 45 sec");
    assert_eq!(body["markdown"], true);
    assert_eq!(body["attachments"][0]["color"], color::RED);
}

#[tokio::test]
async fn test_config_file_drives_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/backend"))
        .and(body_partial_json(serde_json::json!({ "channel": "release-main" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "webhook": "{uri}/hooks/global",
            "channel": "general",
            "policy": {{ "events": {{ "success": true }} }},
            "jobs": {{
                "backend": {{ "webhook": "{uri}/hooks/backend", "channel": "release-$BRANCH" }}
            }}
        }}"#,
        uri = server.uri()
    )
    .unwrap();
    let config = NotifierConfig::load(file.path()).unwrap();

    let project = ProjectRecord::new("backend").with_build(
        BuildRecord::new(1, outcome(ResultKind::Success, 0, 3_000)).with_environment(&[("BRANCH", "main")]),
    );
    let history = HistorySnapshot::new(vec![project]);
    let (project, build) = history.find_build("backend", 1).unwrap();
    let env = history.environment(project, build).unwrap();

    let client = WebhookClient::new(config.webhook_config(false)).unwrap();
    let notifier = BuildNotifier::new(
        WebhookChannel::new(client, config.target_for(Some("backend"), &env)),
        config.policy_for("backend"),
    );

    let outcome = notifier.on_completed(&history, "backend", 1).await.unwrap();
    assert!(matches!(
        outcome,
        NotifyOutcome::Delivered {
            status: StatusLabel::Success,
            ..
        }
    ));
    assert!(outcome.delivery().unwrap().success);
}
