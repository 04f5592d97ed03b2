//! Behavioural tests for review notifications across poll passes.

mod support;

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use revwatch::github::{
    GitHubError, IssueComment, PullRequestDiffStats, PullRequestKey, PullRequestSummary,
};
use revwatch::watch::test_support::{InMemoryActivitySource, RecordingSink};
use revwatch::watch::{Monitor, MonitorConfig, PassReport, StateStore, WatchState};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use support::temp_state_file;
use support::runtime::{SharedRuntime, ensure_runtime};

const AUTHOR: &str = "trixtur";

#[derive(ScenarioState, Default)]
struct NotificationState {
    runtime: Slot<SharedRuntime>,
    directory: Slot<TempDir>,
    state_path: Slot<Utf8PathBuf>,
    source: Slot<Arc<InMemoryActivitySource>>,
    sink: Slot<Arc<RecordingSink>>,
    report: Slot<PassReport>,
}

#[fixture]
fn notification_state() -> NotificationState {
    NotificationState::default()
}

fn html_url(number: u64) -> String {
    format!("https://github.com/octo/example/pull/{number}")
}

fn storage_key(number: u64) -> String {
    format!("octo/example#{number}")
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|time| time.with_timezone(&Utc))
        .map_err(|error| format!("invalid timestamp {value}: {error}"))
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

fn source(notification_state: &NotificationState) -> Result<Arc<InMemoryActivitySource>, String> {
    notification_state
        .source
        .get()
        .ok_or_else(|| "activity source not initialised".to_owned())
}

fn state_path(notification_state: &NotificationState) -> Result<Utf8PathBuf, String> {
    notification_state
        .state_path
        .get()
        .ok_or_else(|| "state file not initialised".to_owned())
}

fn prepare(notification_state: &NotificationState) -> Utf8PathBuf {
    let (directory, path) = temp_state_file();

    notification_state.directory.set(directory);
    notification_state.state_path.set(path.clone());
    notification_state
        .source
        .set(Arc::new(InMemoryActivitySource::default()));
    notification_state.sink.set(Arc::new(RecordingSink::default()));
    path
}

#[given("a fresh state file")]
fn fresh_state_file(notification_state: &NotificationState) {
    prepare(notification_state);
}

#[given("an initialized state file")]
fn initialized_state_file(notification_state: &NotificationState) -> Result<(), String> {
    let path = prepare(notification_state);
    let store = StateStore::new(
        path,
        WatchState {
            initialized: true,
            ..WatchState::default()
        },
    );
    store.save().map_err(|error| error.to_string())
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[given("pull request {number:u64} titled {title} awaits my review since {time}")]
fn assigned_pull_request(
    notification_state: &NotificationState,
    number: u64,
    title: String,
    time: String,
) -> Result<(), String> {
    source(notification_state)?.set_assigned(vec![PullRequestSummary {
        number,
        title: unquote(&title).to_owned(),
        html_url: html_url(number),
        updated_at: parse_time(&time)?,
    }]);
    Ok(())
}

#[given(
    "pull request {number:u64} adds {additions:u64} lines, removes {deletions:u64} lines and \
     touches {files:u64} files"
)]
fn pull_request_diff(
    notification_state: &NotificationState,
    number: u64,
    additions: u64,
    deletions: u64,
    files: u64,
) -> Result<(), String> {
    source(notification_state)?.set_details(
        &storage_key(number),
        PullRequestDiffStats {
            number,
            title: String::new(),
            additions,
            deletions,
            changed_files: files,
        },
    );
    Ok(())
}

#[given("the details of pull request {number:u64} cannot be fetched")]
fn details_unavailable(notification_state: &NotificationState, number: u64) -> Result<(), String> {
    source(notification_state)?.fail_details(
        &storage_key(number),
        GitHubError::Api {
            message: "GitHub returned 502".to_owned(),
        },
    );
    Ok(())
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[given("my pull request {number:u64} titled {title} was updated at {time}")]
fn authored_pull_request(
    notification_state: &NotificationState,
    number: u64,
    title: String,
    time: String,
) -> Result<(), String> {
    source(notification_state)?.set_authored(vec![PullRequestSummary {
        number,
        title: unquote(&title).to_owned(),
        html_url: html_url(number),
        updated_at: parse_time(&time)?,
    }]);
    Ok(())
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[given("pull request {number:u64} has a comment by {author} at {time} saying {body}")]
fn pull_request_comment(
    notification_state: &NotificationState,
    number: u64,
    author: String,
    time: String,
    body: String,
) -> Result<(), String> {
    source(notification_state)?.set_comments(
        &storage_key(number),
        vec![IssueComment {
            id: number * 1000,
            body: unquote(&body).to_owned(),
            updated_at: parse_time(&time)?,
            author: Some(author.trim().to_owned()),
            html_url: None,
        }],
    );
    Ok(())
}

fn poll_from_disk(notification_state: &NotificationState) -> Result<(), String> {
    let runtime = ensure_runtime(&notification_state.runtime).map_err(|error| error.to_string())?;
    let store =
        StateStore::load(state_path(notification_state)?).map_err(|error| error.to_string())?;
    let sink = notification_state
        .sink
        .get()
        .ok_or_else(|| "sink not initialised".to_owned())?;

    let monitor = Monitor::new(
        MonitorConfig {
            author: AUTHOR.to_owned(),
            request_timeout: Duration::from_secs(5),
            ..MonitorConfig::default()
        },
        source(notification_state)?,
        sink,
        Arc::new(store),
    );

    let report = runtime
        .block_on(monitor.poll_once(&CancellationToken::new()))
        .map_err(|error| error.to_string())?;
    notification_state.report.set(report);
    Ok(())
}

#[when("the monitor polls once")]
fn poll_once(notification_state: &NotificationState) -> Result<(), String> {
    poll_from_disk(notification_state)
}

#[when("the monitor restarts and polls again")]
fn restart_and_poll(notification_state: &NotificationState) -> Result<(), String> {
    poll_from_disk(notification_state)
}

#[then("{count:u64} notifications are shown")]
fn assert_notification_count(
    notification_state: &NotificationState,
    count: u64,
) -> Result<(), String> {
    let actual = notification_state
        .sink
        .with_ref(|sink| sink.notifications().len() as u64)
        .ok_or_else(|| "sink not initialised".to_owned())?;

    if actual == count {
        Ok(())
    } else {
        Err(format!("expected {count} notifications but found {actual}"))
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[then("the latest notification reads {expected}")]
fn assert_latest_body(
    notification_state: &NotificationState,
    expected: String,
) -> Result<(), String> {
    let expected_body = unquote(&expected);
    let latest = notification_state
        .sink
        .with_ref(|sink| sink.bodies().last().cloned())
        .flatten()
        .ok_or_else(|| "no notification was shown".to_owned())?;

    if latest == expected_body {
        Ok(())
    } else {
        Err(format!("expected body {expected_body:?} but found {latest:?}"))
    }
}

#[then("the state file is marked initialized")]
fn assert_initialized(notification_state: &NotificationState) -> Result<(), String> {
    let store =
        StateStore::load(state_path(notification_state)?).map_err(|error| error.to_string())?;
    let persisted = notification_state
        .report
        .with_ref(|report| report.persisted)
        .unwrap_or(false);

    if store.is_initialized() && persisted {
        Ok(())
    } else {
        Err("state file was not marked initialized".to_owned())
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[then("the assigned watermark for pull request {number:u64} is {time}")]
fn assert_assigned_watermark(
    notification_state: &NotificationState,
    number: u64,
    time: String,
) -> Result<(), String> {
    let expected = parse_time(&time)?;
    let store =
        StateStore::load(state_path(notification_state)?).map_err(|error| error.to_string())?;
    let key =
        PullRequestKey::resolve(&html_url(number), number).map_err(|error| error.to_string())?;

    match store.assigned_watermark(&key) {
        Some(stored) if stored == expected => Ok(()),
        other => Err(format!("expected watermark {expected} but found {other:?}")),
    }
}

#[scenario(path = "tests/features/review_notifications.feature", index = 0)]
fn first_run_records_baseline(notification_state: NotificationState) {
    let _ = notification_state;
}

#[scenario(path = "tests/features/review_notifications.feature", index = 1)]
fn new_review_request_is_announced(notification_state: NotificationState) {
    let _ = notification_state;
}

#[scenario(path = "tests/features/review_notifications.feature", index = 2)]
fn new_comment_is_announced(notification_state: NotificationState) {
    let _ = notification_state;
}

#[scenario(path = "tests/features/review_notifications.feature", index = 3)]
fn failed_detail_lookup_advances_watermark(notification_state: NotificationState) {
    let _ = notification_state;
}

#[scenario(path = "tests/features/review_notifications.feature", index = 4)]
fn restart_does_not_repeat_notifications(notification_state: NotificationState) {
    let _ = notification_state;
}
