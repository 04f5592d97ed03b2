//! Pure change detection for both tracking flows.
//!
//! The functions here never touch the network or the state store. They take
//! a stored watermark plus a freshly fetched snapshot and return the events
//! to raise together with the advanced watermark, so the orchestrator only
//! has to fetch, dispatch and record.

use chrono::{DateTime, Utc};

use crate::github::{
    IssueComment, PullRequestDiffStats, PullRequestKey, PullRequestSummary, Review,
};
use crate::notify::Notification;

use super::state::{AuthoredWatermark, later};

/// Maximum characters kept from a comment body.
pub const COMMENT_SUMMARY_LIMIT: usize = 220;
/// Maximum characters kept from a review body.
pub const REVIEW_SUMMARY_LIMIT: usize = 180;

const UNKNOWN_AUTHOR: &str = "unknown";

/// Outcome of inspecting one assigned pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedDecision {
    /// Whether the pull request changed since it was last seen.
    pub notify: bool,
    /// Watermark to store.
    pub watermark: DateTime<Utc>,
}

/// Decides whether an assigned pull request needs a notification.
///
/// A missing watermark counts as the zero timestamp, so a pull request seen
/// for the first time after initialisation notifies once.
#[must_use]
pub fn decide_assigned(
    initialized: bool,
    watermark: Option<DateTime<Utc>>,
    observed_updated_at: DateTime<Utc>,
) -> AssignedDecision {
    let changed = watermark.is_none_or(|stored| observed_updated_at > stored);
    AssignedDecision {
        notify: initialized && changed,
        watermark: watermark.map_or(observed_updated_at, |stored| {
            stored.max(observed_updated_at)
        }),
    }
}

/// Builds the review-request notification for an assigned pull request.
#[must_use]
pub fn assigned_notification(
    key: &PullRequestKey,
    summary: &PullRequestSummary,
    details: &PullRequestDiffStats,
) -> Notification {
    let title = if details.title.trim().is_empty() {
        summary.title.clone()
    } else {
        details.title.clone()
    };

    Notification {
        title,
        subtitle: key.repository().to_string(),
        body: format!(
            "#{} · +{} −{} · {} files",
            key.number().get(),
            details.additions,
            details.deletions,
            details.changed_files
        ),
        link: Some(summary.html_url.clone()),
    }
}

/// Outcome of inspecting one authored pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredDecision {
    /// Notifications to raise, comments first then reviews.
    pub events: Vec<Notification>,
    /// Watermark pair to store.
    pub watermark: AuthoredWatermark,
}

/// Decides which comments and reviews on an authored pull request are new.
///
/// Comments and reviews are judged against their own watermark component
/// only. Reviews without a submission time are ignored.
#[must_use]
pub fn decide_authored(
    initialized: bool,
    watermark: AuthoredWatermark,
    pull_request: &PullRequestSummary,
    key: &PullRequestKey,
    comments: &[IssueComment],
    reviews: &[Review],
) -> AuthoredDecision {
    let subtitle = key.to_string();
    let mut events = Vec::new();

    let mut comment_mark = watermark.last_issue_comment;
    for comment in comments {
        comment_mark = later(comment_mark, Some(comment.updated_at));
        let is_new = watermark
            .last_issue_comment
            .is_none_or(|stored| comment.updated_at > stored);
        if initialized && is_new {
            events.push(Notification {
                title: pull_request.title.clone(),
                subtitle: subtitle.clone(),
                body: format!(
                    "{}: {}",
                    author_or_unknown(comment.author.as_deref()),
                    summarize_text(&comment.body, COMMENT_SUMMARY_LIMIT)
                ),
                link: comment.html_url.clone(),
            });
        }
    }

    let mut review_mark = watermark.last_review;
    for review in reviews {
        let Some(submitted_at) = review.submitted_at else {
            continue;
        };
        review_mark = later(review_mark, Some(submitted_at));
        let is_new = watermark
            .last_review
            .is_none_or(|stored| submitted_at > stored);
        if initialized && is_new {
            events.push(Notification {
                title: pull_request.title.clone(),
                subtitle: subtitle.clone(),
                body: review_message(review),
                link: review.html_url.clone(),
            });
        }
    }

    AuthoredDecision {
        events,
        watermark: AuthoredWatermark {
            last_issue_comment: comment_mark,
            last_review: review_mark,
        },
    }
}

fn review_message(review: &Review) -> String {
    let author = author_or_unknown(review.author.as_deref());
    let state = title_case(&review.state);
    let summary = summarize_text(&review.body, REVIEW_SUMMARY_LIMIT);
    if summary.is_empty() {
        format!("{author}: {state}")
    } else {
        format!("{author}: {state} — {summary}")
    }
}

fn author_or_unknown(author: Option<&str>) -> &str {
    author
        .map(str::trim)
        .filter(|login| !login.is_empty())
        .unwrap_or(UNKNOWN_AUTHOR)
}

/// Reduces a Markdown body to a single display line of at most `limit`
/// characters.
///
/// Uses the first line, or the second when the first is blank. Appends `…`
/// when the line is cut.
#[must_use]
pub fn summarize_text(body: &str, limit: usize) -> String {
    if body.trim().is_empty() {
        return String::new();
    }

    let normalized = body.replace("\r\n", "\n");
    let mut lines = normalized.split('\n');
    let first = lines.next().unwrap_or_default().trim();
    let line = if first.is_empty() {
        lines.next().map_or(first, str::trim)
    } else {
        first
    };

    if line.chars().count() > limit {
        let head: String = line.chars().take(limit).collect();
        format!("{head}…")
    } else {
        line.to_owned()
    }
}

/// Lowercases `input` and capitalises its first character.
#[must_use]
pub fn title_case(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut chars = lower.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::{
        assigned_notification, decide_assigned, decide_authored, summarize_text, title_case,
    };
    use crate::github::{
        IssueComment, PullRequestDiffStats, PullRequestKey, PullRequestSummary, Review,
    };
    use crate::watch::state::AuthoredWatermark;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn pull_request() -> PullRequestSummary {
        PullRequestSummary {
            number: 99,
            title: "Refactor data pipeline".to_owned(),
            html_url: "https://github.com/octo/example/pull/99".to_owned(),
            updated_at: at(13, 30),
        }
    }

    #[fixture]
    fn key() -> PullRequestKey {
        PullRequestKey::resolve("https://github.com/octo/example/pull/99", 99)
            .expect("key should resolve")
    }

    fn comment(id: u64, updated_at: DateTime<Utc>, author: &str, body: &str) -> IssueComment {
        IssueComment {
            id,
            body: body.to_owned(),
            updated_at,
            author: Some(author.to_owned()),
            html_url: Some(format!(
                "https://github.com/octo/example/pull/99#issuecomment-{id}"
            )),
        }
    }

    fn review(id: u64, submitted_at: Option<DateTime<Utc>>, state: &str, body: &str) -> Review {
        Review {
            id,
            body: body.to_owned(),
            state: state.to_owned(),
            submitted_at,
            author: Some("lead".to_owned()),
            html_url: Some(format!(
                "https://github.com/octo/example/pull/99#pullrequestreview-{id}"
            )),
        }
    }

    #[rstest]
    fn absent_watermark_notifies_once_initialised() {
        let decision = decide_assigned(true, None, at(13, 0));

        assert!(decision.notify);
        assert_eq!(decision.watermark, at(13, 0));
    }

    #[rstest]
    fn equal_timestamp_is_not_new() {
        let decision = decide_assigned(true, Some(at(12, 0)), at(12, 0));

        assert!(!decision.notify);
        assert_eq!(decision.watermark, at(12, 0));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::older(Some(at(9, 0)))]
    fn cold_start_sets_watermark_silently(#[case] watermark: Option<DateTime<Utc>>) {
        let decision = decide_assigned(false, watermark, at(13, 0));

        assert!(!decision.notify);
        assert_eq!(decision.watermark, at(13, 0));
    }

    #[rstest]
    fn assigned_watermark_does_not_move_backwards() {
        let decision = decide_assigned(true, Some(at(14, 0)), at(13, 0));

        assert!(!decision.notify);
        assert_eq!(decision.watermark, at(14, 0));
    }

    #[rstest]
    fn assigned_decision_is_idempotent() {
        let first = decide_assigned(true, Some(at(12, 0)), at(13, 0));
        let second = decide_assigned(true, Some(first.watermark), at(13, 0));

        assert!(first.notify);
        assert!(!second.notify);
        assert_eq!(second.watermark, first.watermark);
    }

    #[rstest]
    fn assigned_notification_describes_diff_size(
        key: PullRequestKey,
        pull_request: PullRequestSummary,
    ) {
        let details = PullRequestDiffStats {
            number: 99,
            title: "Refactor data pipeline".to_owned(),
            additions: 120,
            deletions: 30,
            changed_files: 5,
        };

        let notification = assigned_notification(&key, &pull_request, &details);

        assert_eq!(notification.title, "Refactor data pipeline");
        assert_eq!(notification.subtitle, "octo/example");
        assert_eq!(notification.body, "#99 · +120 −30 · 5 files");
        assert_eq!(
            notification.link.as_deref(),
            Some("https://github.com/octo/example/pull/99")
        );
    }

    #[rstest]
    fn new_comment_produces_one_event(key: PullRequestKey, pull_request: PullRequestSummary) {
        let watermark = AuthoredWatermark {
            last_issue_comment: Some(at(12, 0)),
            last_review: None,
        };
        let comments = [comment(1, at(13, 0), "teammate", "Looks good overall!")];

        let decision = decide_authored(true, watermark, &pull_request, &key, &comments, &[]);

        assert_eq!(decision.events.len(), 1);
        let event = decision.events.first().expect("one event");
        assert_eq!(event.body, "teammate: Looks good overall!");
        assert_eq!(event.subtitle, "octo/example#99");
        assert_eq!(decision.watermark.last_issue_comment, Some(at(13, 0)));
        assert_eq!(decision.watermark.last_review, None);
    }

    #[rstest]
    fn new_review_is_title_cased_and_summarised(
        key: PullRequestKey,
        pull_request: PullRequestSummary,
    ) {
        let watermark = AuthoredWatermark {
            last_issue_comment: None,
            last_review: Some(at(11, 0)),
        };
        let reviews = [review(2, Some(at(13, 30)), "approved", "Approved with minor nits.")];

        let decision = decide_authored(true, watermark, &pull_request, &key, &[], &reviews);

        let bodies: Vec<&str> = decision
            .events
            .iter()
            .map(|event| event.body.as_str())
            .collect();
        assert_eq!(bodies, ["lead: Approved — Approved with minor nits."]);
        assert_eq!(decision.watermark.last_review, Some(at(13, 30)));
    }

    #[rstest]
    fn review_without_body_shows_state_only(
        key: PullRequestKey,
        pull_request: PullRequestSummary,
    ) {
        let reviews = [review(3, Some(at(13, 30)), "CHANGES_REQUESTED", " \r\n ")];

        let decision = decide_authored(
            true,
            AuthoredWatermark::default(),
            &pull_request,
            &key,
            &[],
            &reviews,
        );

        let event = decision.events.first().expect("one event");
        assert_eq!(event.body, "lead: Changes_requested");
    }

    #[rstest]
    fn pending_reviews_never_emit_or_advance(
        key: PullRequestKey,
        pull_request: PullRequestSummary,
    ) {
        let watermark = AuthoredWatermark {
            last_issue_comment: None,
            last_review: Some(at(11, 0)),
        };
        let reviews = [review(4, None, "PENDING", "draft thoughts")];

        let decision = decide_authored(true, watermark, &pull_request, &key, &[], &reviews);

        assert!(decision.events.is_empty());
        assert_eq!(decision.watermark, watermark);
    }

    #[rstest]
    fn cold_start_suppresses_authored_events(
        key: PullRequestKey,
        pull_request: PullRequestSummary,
    ) {
        let comments = [comment(1, at(13, 0), "teammate", "Looks good overall!")];
        let reviews = [review(2, Some(at(13, 30)), "APPROVED", "")];

        let decision = decide_authored(
            false,
            AuthoredWatermark::default(),
            &pull_request,
            &key,
            &comments,
            &reviews,
        );

        assert!(decision.events.is_empty());
        assert_eq!(decision.watermark.last_issue_comment, Some(at(13, 0)));
        assert_eq!(decision.watermark.last_review, Some(at(13, 30)));
    }

    #[rstest]
    fn comments_and_reviews_advance_independently(
        key: PullRequestKey,
        pull_request: PullRequestSummary,
    ) {
        let watermark = AuthoredWatermark {
            last_issue_comment: Some(at(12, 0)),
            last_review: Some(at(14, 0)),
        };
        let comments = [comment(1, at(13, 0), "teammate", "comment")];
        let reviews = [review(2, Some(at(13, 30)), "COMMENTED", "older than watermark")];

        let decision = decide_authored(true, watermark, &pull_request, &key, &comments, &reviews);

        assert_eq!(decision.events.len(), 1);
        assert_eq!(decision.watermark.last_issue_comment, Some(at(13, 0)));
        assert_eq!(decision.watermark.last_review, Some(at(14, 0)));
    }

    #[rstest]
    fn comment_events_precede_review_events(
        key: PullRequestKey,
        pull_request: PullRequestSummary,
    ) {
        let comments = [comment(1, at(13, 45), "teammate", "later comment")];
        let reviews = [review(2, Some(at(13, 30)), "APPROVED", "earlier review")];

        let decision = decide_authored(
            true,
            AuthoredWatermark::default(),
            &pull_request,
            &key,
            &comments,
            &reviews,
        );

        let bodies: Vec<&str> = decision
            .events
            .iter()
            .map(|event| event.body.as_str())
            .collect();
        assert_eq!(
            bodies,
            ["teammate: later comment", "lead: Approved — earlier review"]
        );
    }

    #[rstest]
    fn authored_decision_is_idempotent(key: PullRequestKey, pull_request: PullRequestSummary) {
        let comments = [comment(1, at(13, 0), "teammate", "one")];
        let reviews = [review(2, Some(at(13, 30)), "APPROVED", "two")];
        let first = decide_authored(
            true,
            AuthoredWatermark::default(),
            &pull_request,
            &key,
            &comments,
            &reviews,
        );

        let second = decide_authored(
            true,
            first.watermark,
            &pull_request,
            &key,
            &comments,
            &reviews,
        );

        assert_eq!(first.events.len(), 2);
        assert!(second.events.is_empty());
        assert_eq!(second.watermark, first.watermark);
    }

    #[rstest]
    fn missing_author_renders_as_unknown(key: PullRequestKey, pull_request: PullRequestSummary) {
        let mut anonymous = comment(1, at(13, 0), "", "hello");
        anonymous.author = None;

        let decision = decide_authored(
            true,
            AuthoredWatermark::default(),
            &pull_request,
            &key,
            &[anonymous],
            &[],
        );

        let event = decision.events.first().expect("one event");
        assert_eq!(event.body, "unknown: hello");
    }

    #[rstest]
    #[case::blank(" \n\t ", 10, "")]
    #[case::first_line("first\nsecond", 10, "first")]
    #[case::second_line_when_first_blank("   \r\nsecond line", 20, "second line")]
    #[case::crlf("hello\r\nworld", 20, "hello")]
    #[case::truncated("abcdefghij", 4, "abcd…")]
    #[case::unicode("ééééé", 3, "ééé…")]
    #[case::exact_fit("abcd", 4, "abcd")]
    fn summarisation(#[case] body: &str, #[case] limit: usize, #[case] expected: &str) {
        assert_eq!(summarize_text(body, limit), expected);
    }

    #[rstest]
    #[case::upper("APPROVED", "Approved")]
    #[case::snake("changes_requested", "Changes_requested")]
    #[case::mixed("cOMMENTED", "Commented")]
    #[case::empty("", "")]
    fn state_title_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(title_case(input), expected);
    }
}
