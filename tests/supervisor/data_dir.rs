//! Data directory drift ends the session

use super::helpers::*;
use babysitter::monitor::DataDirWatcher;
use babysitter::report::ReportKind;
use babysitter::supervisor::{CancelToken, SessionEnd, TickOutcome};
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

#[test]
fn test_new_directory_restarts_session() {
    let tmp = TempDir::new().unwrap();
    for name in ["3", "9"] {
        fs::create_dir(tmp.path().join(name)).unwrap();
    }

    let system = Rc::new(FakeSystem::default());
    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_watcher(DataDirWatcher::new(tmp.path(), Some("9".to_string())));

    sup.start();
    assert_eq!(sup.tick(), TickOutcome::Continue);

    fs::create_dir(tmp.path().join("10")).unwrap();
    assert_eq!(
        sup.tick(),
        TickOutcome::RestartSession {
            directory: "10".to_string()
        }
    );

    assert_eq!(system.sent_kinds(), vec![ReportKind::Running, ReportKind::NewDirectory]);
    let closing = &system.sent()[1];
    assert_eq!(closing.subject(), "Babysitter found new data directory");
    assert!(closing
        .to_text()
        .starts_with("New data directory found: 10. Restarting session."));
}

#[test]
fn test_run_returns_new_directory() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("2")).unwrap();

    let system = Rc::new(FakeSystem::default());
    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_watcher(DataDirWatcher::new(tmp.path(), Some("1".to_string())));

    assert_eq!(
        sup.run(),
        SessionEnd::NewDirectory {
            directory: "2".to_string()
        }
    );
    // Drift is not a shutdown
    assert!(!system.sent_kinds().contains(&ReportKind::Shutdown));
}

#[test]
fn test_missing_base_is_not_drift() {
    let system = Rc::new(FakeSystem::default());
    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_watcher(DataDirWatcher::new("/nonexistent/data", Some("1".to_string())));

    sup.start();
    assert_eq!(sup.tick(), TickOutcome::Continue);
}
