//! Free disk space check with a linear time-to-full estimate.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::models::CheckState;

use super::format_span;
use super::inspect::Inspector;

/// FAIL once free space at `path` drops to `threshold_mb` or below.
#[derive(Debug, Clone)]
pub struct DiskSpace {
    path: PathBuf,
    threshold_mb: f64,
    initial_free_mb: Option<f64>,
    started_at: DateTime<Local>,
    /// No estimate is reported until at least this much time has passed.
    min_elapsed: Duration,
}

impl DiskSpace {
    pub fn new(
        path: impl Into<PathBuf>,
        threshold_mb: f64,
        min_elapsed: Duration,
        inspector: &dyn Inspector,
        now: DateTime<Local>,
    ) -> Self {
        let path = path.into();
        let initial_free_mb = inspector.free_space_mb(&path).ok();
        Self {
            path,
            threshold_mb,
            initial_free_mb,
            started_at: now,
            min_elapsed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold_mb(&self) -> f64 {
        self.threshold_mb
    }

    pub fn evaluate(&mut self, inspector: &dyn Inspector) -> CheckState {
        match inspector.free_space_mb(&self.path) {
            Ok(free) => CheckState::from_healthy(free > self.threshold_mb),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "free space query failed");
                CheckState::Fail
            }
        }
    }

    /// Seconds until the disk is full at the rate observed since start.
    pub fn seconds_until_full(&self, current_free_mb: f64, now: DateTime<Local>) -> Option<f64> {
        let initial = self.initial_free_mb?;
        let elapsed = elapsed_secs(self.started_at, now);
        if elapsed <= self.min_elapsed.as_secs_f64() {
            return None;
        }
        seconds_until_full(current_free_mb, decay_rate(initial, current_free_mb, elapsed))
    }

    pub(super) fn extra_text(&self, inspector: &dyn Inspector, now: DateTime<Local>) -> String {
        let free = match inspector.free_space_mb(&self.path) {
            Ok(free) => free,
            Err(e) => return format!(", unable to read free space: {e}"),
        };

        let mut msg = format!(", remaining={free:.0} MB");
        if let Some(secs) = self.seconds_until_full(free, now) {
            msg.push_str(&format!(", time until full={}", format_span(secs)));
            if let Some(full_on) = chrono::Duration::try_milliseconds((secs * 1000.0) as i64)
                .and_then(|d| now.checked_add_signed(d))
            {
                msg.push_str(&format!(", full on {}", full_on.format("%d/%m/%y %H:%M")));
            }
        }
        msg
    }

    #[cfg(test)]
    pub(crate) fn set_initial(&mut self, free_mb: f64, at: DateTime<Local>) {
        self.initial_free_mb = Some(free_mb);
        self.started_at = at;
    }
}

/// Rate of change of free space in MB per second; negative when shrinking.
pub fn decay_rate(initial_free_mb: f64, current_free_mb: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (current_free_mb - initial_free_mb) / elapsed_secs
}

/// Linear extrapolation of the time left; `None` unless space is shrinking.
pub fn seconds_until_full(free_mb: f64, rate_mb_per_sec: f64) -> Option<f64> {
    if rate_mb_per_sec < 0.0 {
        Some(free_mb / -rate_mb_per_sec)
    } else {
        None
    }
}

fn elapsed_secs(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;

    struct FixedDisk(Cell<f64>);

    impl Inspector for FixedDisk {
        fn free_space_mb(&self, _path: &Path) -> io::Result<f64> {
            Ok(self.0.get())
        }

        fn find_process(&self, _name: &str) -> io::Result<Vec<u32>> {
            Ok(Vec::new())
        }
    }

    struct BrokenDisk;

    impl Inspector for BrokenDisk {
        fn free_space_mb(&self, _path: &Path) -> io::Result<f64> {
            Err(io::Error::other("statvfs failed"))
        }

        fn find_process(&self, _name: &str) -> io::Result<Vec<u32>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_decay_rate_and_time_until_full() {
        let rate = decay_rate(1000.0, 990.0, 100.0);
        assert!((rate - -0.1).abs() < 1e-9);

        let secs = seconds_until_full(990.0, rate).unwrap();
        assert!((secs - 9900.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_estimate_when_space_grows_or_stays() {
        assert_eq!(seconds_until_full(500.0, 0.0), None);
        assert_eq!(seconds_until_full(500.0, 0.5), None);
        assert_eq!(decay_rate(100.0, 50.0, 0.0), 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive_fail() {
        let disk = FixedDisk(Cell::new(200.0));
        let now = Local::now();
        let mut check = DiskSpace::new("/", 200.0, Duration::from_secs(10), &disk, now);
        assert_eq!(check.evaluate(&disk), CheckState::Fail);

        disk.0.set(200.5);
        assert_eq!(check.evaluate(&disk), CheckState::Ok);
    }

    #[test]
    fn test_query_failure_is_fail() {
        let mut check =
            DiskSpace::new("/", 10.0, Duration::from_secs(10), &BrokenDisk, Local::now());
        assert_eq!(check.evaluate(&BrokenDisk), CheckState::Fail);
        assert!(check.extra_text(&BrokenDisk, Local::now()).contains("unable to read"));
    }

    #[test]
    fn test_estimate_waits_for_one_poll_interval() {
        let disk = FixedDisk(Cell::new(990.0));
        let now = Local::now();
        let mut check = DiskSpace::new("/", 10.0, Duration::from_secs(10), &disk, now);

        check.set_initial(1000.0, now - chrono::Duration::seconds(5));
        assert_eq!(check.seconds_until_full(990.0, now), None);

        check.set_initial(1000.0, now - chrono::Duration::seconds(100));
        let secs = check.seconds_until_full(990.0, now).unwrap();
        assert!((secs - 9900.0).abs() < 1e-6);

        let text = check.extra_text(&disk, now);
        assert!(text.contains("remaining=990 MB"));
        assert!(text.contains("time until full=0days 2hrs 45mins"));
        assert!(text.contains("full on"));
    }
}
