//! Scheduled heartbeat reports

use super::helpers::*;
use babysitter::monitor::HeartbeatSchedule;
use babysitter::report::{DiagnosticCommand, ReportKind};
use babysitter::supervisor::{CancelToken, TickOutcome};
use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

fn at(hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 1, 15, hour, minute, 0)
        .single()
        .unwrap()
}

#[test]
fn test_heartbeat_once_in_target_hour() {
    let system = Rc::new(FakeSystem::default());
    system.set_free_mb(500.0);
    let heartbeat =
        HeartbeatSchedule::new(Some(6)).with_commands(vec![DiagnosticCommand::new("stats --html")]);

    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_checks([disk(&system, 100.0)])
        .with_heartbeat(heartbeat);

    assert_eq!(sup.start_at(at(5, 59)), TickOutcome::Continue);
    for (h, m) in [(5, 59), (6, 0), (6, 10), (6, 59), (7, 0)] {
        assert_eq!(sup.tick_at(at(h, m)), TickOutcome::Continue);
    }

    assert_eq!(system.sent_kinds(), vec![ReportKind::Running, ReportKind::Heartbeat]);
    // Once for the initial report, once for the scheduled one
    assert_eq!(system.ran(), vec!["stats --html", "stats --html"]);
    assert!(system.sent()[1].to_text().contains("Successfully ran stats --html"));
}

#[test]
fn test_start_in_target_hour_does_not_repeat() {
    let system = Rc::new(FakeSystem::default());
    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_heartbeat(HeartbeatSchedule::new(Some(6)));

    sup.start_at(at(6, 30));
    sup.tick_at(at(6, 40));

    assert_eq!(system.sent_kinds(), vec![ReportKind::Running]);
}

#[test]
fn test_heartbeat_relays_report_file() {
    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("index.html");
    fs::write(&index, "<html><body><h1>Power</h1><img src=\"day.png\"></body></html>").unwrap();
    fs::write(tmp.path().join("day.png"), [1u8, 2, 3]).unwrap();

    let system = Rc::new(FakeSystem::default());
    let heartbeat = HeartbeatSchedule::new(Some(6)).with_report_file(Some(index));
    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_heartbeat(heartbeat);
    sup.start_at(at(6, 0));

    let sent = system.sent();
    assert_eq!(sent[0].attachments().len(), 1);
    assert!(sent[0].to_html().contains("src=\"cid:day.png\""));
    assert!(sent[0].to_text().contains("Power"));
}

#[test]
fn test_missing_report_file_keeps_timestamp() {
    let system = Rc::new(FakeSystem::default());
    let missing = PathBuf::from("/nonexistent/index.html");
    let heartbeat = HeartbeatSchedule::new(Some(6)).with_report_file(Some(missing));
    let mut sup = supervisor(&system, fast_settings(), CancelToken::new())
        .with_heartbeat(heartbeat);
    sup.start_at(at(6, 0));

    let text = system.sent()[0].to_text();
    assert!(text.contains("Failed to open filename /nonexistent/index.html"));
    assert!(text.contains(&format!("Unixtime = {}", at(6, 0).timestamp())));
}
