//! Refused notifier credentials end the session

use super::helpers::*;
use babysitter::report::ReportKind;
use babysitter::supervisor::{run_sessions, CancelToken, SessionEnd, SessionPolicy, TickOutcome};
use std::cell::Cell;
use std::rc::Rc;

fn failing(system: &Rc<FakeSystem>, accept: usize) -> (Box<AuthFailingNotifier>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let notifier = AuthFailingNotifier {
        system: Rc::clone(system),
        accept,
        calls: Rc::clone(&calls),
    };
    (Box::new(notifier), calls)
}

#[test]
fn test_auth_failure_on_alert_is_fatal() {
    let system = Rc::new(FakeSystem::default());
    system.set_free_mb(500.0);
    let (notifier, calls) = failing(&system, 1);

    let mut sup = supervisor_with_notifier(&system, notifier, fast_settings(), CancelToken::new())
        .with_checks([disk(&system, 100.0)]);
    assert_eq!(sup.start(), TickOutcome::Continue);

    system.set_free_mb(10.0);
    match sup.tick() {
        TickOutcome::FatalShutdown { reason } => {
            assert!(reason.contains("authentication failed"), "reason: {reason}");
        }
        other => panic!("Expected FatalShutdown, got {other:?}"),
    }
    assert_eq!(calls.get(), 2);

    // Nothing more goes out, not even the shutdown report
    system.set_free_mb(500.0);
    sup.tick();
    sup.shutdown("notifier authentication failed");
    assert_eq!(calls.get(), 2);
    assert_eq!(system.sent_kinds(), vec![ReportKind::Running]);
}

#[test]
fn test_auth_failure_at_start_ends_run() {
    let system = Rc::new(FakeSystem::default());
    system.set_free_mb(500.0);
    let (notifier, calls) = failing(&system, 0);

    let mut sup = supervisor_with_notifier(&system, notifier, fast_settings(), CancelToken::new())
        .with_checks([disk(&system, 100.0)]);

    assert!(matches!(sup.run(), SessionEnd::Fatal { .. }));
    assert_eq!(calls.get(), 1);
    assert!(system.sent().is_empty());
}

#[test]
fn test_auth_failure_exits_with_error() {
    let system = Rc::new(FakeSystem::default());
    let cancel = CancelToken::new();
    let calls = Rc::new(Cell::new(0));

    let exit = run_sessions(
        || {
            let notifier = AuthFailingNotifier {
                system: Rc::clone(&system),
                accept: 0,
                calls: Rc::clone(&calls),
            };
            Ok(supervisor_with_notifier(
                &system,
                Box::new(notifier),
                fast_settings(),
                cancel.clone(),
            ))
        },
        SessionPolicy::default(),
        &cancel,
    );

    assert_eq!(exit.exit_code(), 1);
    assert_eq!(calls.get(), 1);
}
