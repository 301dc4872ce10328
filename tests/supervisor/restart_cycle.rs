//! Process failure, restart and recovery

use super::helpers::*;
use babysitter::models::CheckState;
use babysitter::report::{Block, ReportKind};
use babysitter::supervisor::{CancelToken, SessionEnd, TickOutcome};
use chrono::{Local, TimeDelta};
use std::rc::Rc;

#[test]
fn test_restart_cycle_sends_one_alert_and_one_restart() {
    let system = Rc::new(FakeSystem::default());
    system.set_alive("daemon", true);
    system.set_revive_on_restart(true);

    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_checks([process("daemon", 5)]);
    assert_eq!(sup.start(), TickOutcome::Continue);
    assert_eq!(sup.tick(), TickOutcome::Continue);

    system.set_alive("daemon", false);
    assert_eq!(sup.tick(), TickOutcome::Continue);
    assert_eq!(sup.tick(), TickOutcome::Continue);

    assert_eq!(system.spawned(), vec!["restart daemon"]);
    assert_eq!(
        system.sent_kinds(),
        vec![ReportKind::Running, ReportKind::StateChange]
    );
    assert_eq!(sup.checks()[0].last_state(), CheckState::Ok);

    let alert = &system.sent()[1];
    assert_eq!(
        alert.blocks()[1],
        Block::List(vec![
            "daemon=FAIL. Attempting to restart (1/5)... daemon=OK, pid 4242, restarts 1/5"
                .to_string()
        ])
    );
    assert!(alert.to_text().contains("CURRENT STATE OF ALL CHECKERS:"));
    assert!(alert.to_text().contains("Unixtime = "));
}

#[test]
fn test_alert_only_on_edges() {
    let system = Rc::new(FakeSystem::default());
    system.set_free_mb(500.0);

    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_checks([disk(&system, 100.0)]);
    sup.start();

    system.set_free_mb(50.0);
    for _ in 0..3 {
        assert_eq!(sup.tick(), TickOutcome::Continue);
    }
    system.set_free_mb(300.0);
    sup.tick();

    assert_eq!(
        system.sent_kinds(),
        vec![ReportKind::Running, ReportKind::StateChange, ReportKind::StateChange]
    );
    let sent = system.sent();
    assert!(sent[1].to_text().contains("disk space=FAIL, remaining=50 MB"));
    assert!(sent[2].to_text().contains("disk space=OK, remaining=300 MB"));
}

#[test]
fn test_alert_includes_diagnostics() {
    let system = Rc::new(FakeSystem::default());
    system.set_free_mb(500.0);
    let mut settings = fast_settings();
    settings.alert_commands =
        vec![babysitter::report::DiagnosticCommand::new("tail syslog").with_stdout()];

    let mut sup = supervisor(&system, settings, CancelToken::new())
        .with_checks([disk(&system, 100.0)]);
    sup.start();
    system.set_free_mb(10.0);
    sup.tick();

    assert_eq!(system.ran(), vec!["tail syslog"]);
    let text = system.sent()[1].to_text();
    assert!(text.contains("Successfully ran tail syslog"));
    assert!(text.contains("output of tail syslog"));
}

#[test]
fn test_retry_exhaustion_is_fatal() {
    let system = Rc::new(FakeSystem::default());
    system.set_alive("daemon", true);

    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_checks([process("daemon", 5)]);
    sup.start();
    system.set_alive("daemon", false);

    for _ in 0..5 {
        assert_eq!(sup.tick(), TickOutcome::Continue);
    }
    match sup.tick() {
        TickOutcome::FatalShutdown { reason } => {
            assert_eq!(reason, "daemon still failing after 5 restart attempts");
        }
        other => panic!("Expected FatalShutdown, got {other:?}"),
    }

    assert_eq!(system.spawned().len(), 5);
    // Only the first FAIL tick is an edge
    assert_eq!(
        system.sent_kinds(),
        vec![ReportKind::Running, ReportKind::StateChange]
    );
}

#[test]
fn test_run_shuts_down_after_exhaustion() {
    let system = Rc::new(FakeSystem::default());

    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_checks([process("daemon", 2)]);
    let end = sup.run();

    assert!(matches!(end, SessionEnd::Fatal { .. }));
    assert_eq!(system.spawned().len(), 2);
    // Dead from the start: no edge, so no state-change alert
    assert_eq!(system.sent_kinds(), vec![ReportKind::Running, ReportKind::Shutdown]);
    assert!(system.sent()[1]
        .to_text()
        .contains("Reason: daemon still failing after 2 restart attempts"));
}

#[test]
fn test_cancelled_run_sends_shutdown_report() {
    let system = Rc::new(FakeSystem::default());
    system.set_free_mb(500.0);
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut sup = supervisor(&system, fast_settings(), cancel).with_checks([disk(&system, 100.0)]);
    assert_eq!(sup.run(), SessionEnd::Interrupted);

    assert_eq!(system.sent_kinds(), vec![ReportKind::Running, ReportKind::Shutdown]);
    let text = system.sent()[1].to_text();
    assert!(text.starts_with("Babysitter SHUTTING DOWN.\nReason: interrupted\n"));
    assert!(text.contains("disk space=OK"));
}

#[test]
fn test_exhaustion_with_injected_past_clock() {
    let system = Rc::new(FakeSystem::default());
    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_checks([process("daemon", 2)]);
    sup.start();

    // Hours behind the wall clock, so only the tick time may drive the retry reset
    let base = Local::now() - TimeDelta::hours(3);
    let outcomes: Vec<TickOutcome> = (0..3)
        .map(|i| sup.tick_at(base + TimeDelta::seconds(10 * i)))
        .collect();

    assert_eq!(outcomes[..2], [TickOutcome::Continue, TickOutcome::Continue]);
    assert_eq!(
        outcomes[2],
        TickOutcome::FatalShutdown {
            reason: "daemon still failing after 2 restart attempts".to_string()
        }
    );
    assert_eq!(system.spawned().len(), 2);
}
