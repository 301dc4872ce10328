use std::time::Duration;

/// Time between two sweeps of the supervisor loop.
pub const UPDATE_PERIOD: Duration = Duration::from_secs(10);

/// Maximum consecutive restart attempts for a watched process.
/// Once the counter reaches this value the next failure is terminal.
pub const MAX_RETRIES: u32 = 5;

/// Quiet period after which a process retry counter goes back to zero.
pub const RESET_RETRIES_AFTER: Duration = Duration::from_secs(60 * 60);

/// Wait after spawning a restart command before re-checking the process.
pub const RESTART_SETTLE: Duration = Duration::from_secs(5);

/// Grace window used to detect a restart command that exits immediately.
pub const SPAWN_GRACE: Duration = Duration::from_millis(500);

/// Upper bound for a diagnostic command run for a report.
pub const DIAGNOSTIC_TIMEOUT: Duration = Duration::from_secs(120);

/// Delivery attempts for a single report before giving up on it.
pub const SEND_ATTEMPTS: u32 = 5;

/// Fixed delay between two delivery attempts.
pub const SEND_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Outer loop budget for session restarts caused by a new data directory.
pub const MAX_SESSION_RESTARTS: u32 = 5;

/// Delay before a new session is built after the previous one ended.
pub const SESSION_RESTART_DELAY: Duration = Duration::from_secs(10);

/// Display name used for every disk space check.
pub const DISK_SPACE_NAME: &str = "disk space";

/// Subject lines for the reports the supervisor sends.
pub mod subjects {
    pub const RUNNING: &str = "Babysitter running";
    pub const HEARTBEAT: &str = "Babysitter heartbeat";
    pub const STATE_CHANGE: &str = "Babysitter detected state change.";
    pub const SHUTDOWN: &str = "Babysitter shutting down";
    pub const NEW_DIRECTORY: &str = "Babysitter found new data directory";
}
