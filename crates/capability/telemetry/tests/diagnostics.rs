use domain::{ConnectionPhase, LinkEvent, ManualClock};
use gw_telemetry::{RepeatLog, StateReporter, fmt_err, truncate};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

fn changed(from: ConnectionPhase, to: ConnectionPhase) -> LinkEvent {
    LinkEvent::StateChanged {
        from,
        to,
        detail: None,
    }
}

#[test]
fn repeat_log_summarizes_after_window() {
    let clock = Arc::new(ManualClock::new());
    let log = RepeatLog::new(Duration::from_secs(600), clock.clone());

    assert!(log.record("connect", "refused", Level::WARN).is_none());
    clock.advance(Duration::from_secs(300));
    assert!(log.record("connect", "refused again", Level::WARN).is_none());
    clock.advance(Duration::from_secs(300));
    let summary = log
        .record("connect", "timed out", Level::WARN)
        .expect("summary");
    assert_eq!(
        summary,
        "summary \"connect\": occurred 3x in 10 min | last: timed out"
    );
    assert_eq!(log.pending(), 0);
}

#[test]
fn repeat_log_flush_drains_every_bucket() {
    let clock = Arc::new(ManualClock::new());
    let log = RepeatLog::new(Duration::from_secs(600), clock.clone());
    log.record("a", "first", Level::WARN);
    clock.advance(Duration::from_secs(1));
    log.record("b", "second", Level::ERROR);

    let flushed = log.flush();
    assert_eq!(flushed.len(), 2);
    assert!(flushed[0].starts_with("summary \"a\": occurred 1x"));
    assert!(flushed[1].ends_with("last: second"));
    assert_eq!(log.pending(), 0);
}

#[test]
fn reporter_logs_only_real_transitions() {
    let clock = Arc::new(ManualClock::new());
    let repeats = Arc::new(RepeatLog::new(Duration::from_secs(600), clock));
    let mut reporter = StateReporter::new(repeats.clone());

    let line = reporter
        .observe(&changed(
            ConnectionPhase::Disconnected,
            ConnectionPhase::Connecting,
        ))
        .expect("first transition");
    assert_eq!(line, "STATE: INIT -> CONNECTING");
    assert!(
        reporter
            .observe(&changed(
                ConnectionPhase::Disconnected,
                ConnectionPhase::Connecting
            ))
            .is_none()
    );

    repeats.record("connect", "refused", Level::WARN);
    let line = reporter
        .observe(&LinkEvent::StateChanged {
            from: ConnectionPhase::Connecting,
            to: ConnectionPhase::Connected,
            detail: Some("session 1".to_string()),
        })
        .expect("connected");
    assert_eq!(line, "STATE: CONNECTING -> CONNECTED | session 1");
    assert_eq!(repeats.pending(), 0);
}

#[test]
fn waiting_notice_printed_once_per_outage() {
    let clock = Arc::new(ManualClock::new());
    let repeats = Arc::new(RepeatLog::new(Duration::from_secs(600), clock));
    let mut reporter = StateReporter::new(repeats);

    assert!(reporter.observe(&LinkEvent::WaitingReconnect).is_some());
    assert!(reporter.observe(&LinkEvent::WaitingReconnect).is_none());

    reporter.observe(&changed(
        ConnectionPhase::Connecting,
        ConnectionPhase::Connected,
    ));
    reporter.observe(&changed(
        ConnectionPhase::Connected,
        ConnectionPhase::Disconnected,
    ));
    assert!(reporter.observe(&LinkEvent::WaitingReconnect).is_some());
}

#[derive(Debug)]
struct Outer(Inner);

#[derive(Debug)]
struct Inner;

impl std::fmt::Display for Outer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connect failed")
    }
}

impl std::error::Error for Outer {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl std::fmt::Display for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ECONNREFUSED")
    }
}

impl std::error::Error for Inner {}

#[test]
fn fmt_err_joins_source_chain() {
    assert_eq!(fmt_err(&Outer(Inner)), "connect failed | ECONNREFUSED");
}

#[test]
fn truncate_marks_cut_text() {
    assert_eq!(truncate("abcdef", 6), "abcdef");
    assert_eq!(truncate("abcdefgh", 6), "abc...");
}
