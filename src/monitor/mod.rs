//! Supervision building blocks
//!
//! State tracking with edge detection, the bounded retry budget and the
//! process restart policy built on it, heartbeat scheduling and the
//! numbered data-directory watcher.

pub mod datadir;
pub mod heartbeat;
pub mod restart;
pub mod retry;
pub mod tracker;

pub use datadir::{latest_numeric_subdir, ChannelLabel, DataDirWatcher};
pub use heartbeat::HeartbeatSchedule;
pub use restart::{RestartOutcome, RestartPolicy};
pub use retry::RetryBudget;
pub use tracker::Tracked;
