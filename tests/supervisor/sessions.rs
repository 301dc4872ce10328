//! Outer session loop

use super::helpers::*;
use anyhow::anyhow;
use babysitter::monitor::DataDirWatcher;
use babysitter::report::ReportKind;
use babysitter::supervisor::{run_sessions, CancelToken, SessionExit, SessionPolicy};
use std::cell::Cell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

fn policy(max_restarts: u32) -> SessionPolicy {
    SessionPolicy {
        max_restarts,
        reset_after: Duration::from_secs(3600),
        restart_delay: Duration::ZERO,
    }
}

#[test]
fn test_session_restarts_are_bounded() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("5")).unwrap();

    let system = Rc::new(FakeSystem::default());
    let builds = Cell::new(0);
    let cancel = CancelToken::new();

    // Every session is bound to a stale directory, so each one drifts at once
    let exit = run_sessions(
        || {
            builds.set(builds.get() + 1);
            Ok(supervisor(&system, fast_settings(), cancel.clone())
                .with_watcher(DataDirWatcher::new(tmp.path(), Some("4".to_string()))))
        },
        policy(2),
        &cancel,
    );

    assert_eq!(builds.get(), 3);
    assert_eq!(exit.exit_code(), 1);
    match exit {
        SessionExit::Fatal { reason } => assert!(reason.contains("session restarts exhausted")),
        other => panic!("Expected Fatal, got {other:?}"),
    }
    let closing = system
        .sent_kinds()
        .iter()
        .filter(|k| **k == ReportKind::NewDirectory)
        .count();
    assert_eq!(closing, 3);
}

#[test]
fn test_build_failure_is_fatal() {
    let exit = run_sessions(|| Err(anyhow!("labels.dat missing")), policy(5), &CancelToken::new());
    assert_eq!(
        exit,
        SessionExit::Fatal {
            reason: "labels.dat missing".to_string()
        }
    );
}

#[test]
fn test_interrupt_exits_cleanly() {
    let system = Rc::new(FakeSystem::default());
    let cancel = CancelToken::new();
    cancel.cancel();

    let exit = run_sessions(
        || Ok(supervisor(&system, fast_settings(), cancel.clone())),
        policy(5),
        &cancel,
    );

    assert_eq!(exit, SessionExit::Interrupted);
    assert_eq!(exit.exit_code(), 0);
    assert_eq!(system.sent_kinds(), vec![ReportKind::Running, ReportKind::Shutdown]);
}

#[test]
fn test_build_failure_after_interrupt_is_not_fatal() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let exit = run_sessions(|| Err(anyhow!("interrupted during startup")), policy(5), &cancel);
    assert_eq!(exit, SessionExit::Interrupted);
}
