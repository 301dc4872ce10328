//! System inspection behind the resource checks.
//!
//! Checks never touch statvfs or the process table directly; they ask an
//! [`Inspector`], so the supervisor can be driven by a scripted fake.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nix::sys::statvfs::statvfs;

/// Bytes per megabyte as used for every free-space figure.
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Live queries a resource check may need.
pub trait Inspector {
    /// Free space available to unprivileged users at `path`, in MB.
    fn free_space_mb(&self, path: &Path) -> io::Result<f64>;

    /// PIDs of running processes whose name matches `name`.
    fn find_process(&self, name: &str) -> io::Result<Vec<u32>>;
}

/// Inspector backed by the running system (statvfs and `/proc`).
#[derive(Debug, Clone)]
pub struct SystemInspector {
    proc_root: PathBuf,
}

impl SystemInspector {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Scan a different procfs mount (used by tests with a fake tree).
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

impl Default for SystemInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector for SystemInspector {
    fn free_space_mb(&self, path: &Path) -> io::Result<f64> {
        let stat = statvfs(path).map_err(io::Error::from)?;
        let available = stat.blocks_available() as f64 * stat.fragment_size() as f64;
        Ok(available / BYTES_PER_MB)
    }

    fn find_process(&self, name: &str) -> io::Result<Vec<u32>> {
        let mut pids = Vec::new();

        for entry in fs::read_dir(&self.proc_root)? {
            // Processes exit while we scan; a vanished entry is not an error
            let Ok(entry) = entry else { continue };

            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<u32>().ok())
            else {
                continue;
            };

            if process_matches(&entry.path(), name) {
                pids.push(pid);
            }
        }

        pids.sort_unstable();
        Ok(pids)
    }
}

/// Match the way `pidof -x` does: the command name, the program path, or
/// the script path when the program is an interpreter.
fn process_matches(proc_dir: &Path, name: &str) -> bool {
    if let Ok(comm) = fs::read_to_string(proc_dir.join("comm")) {
        if comm.trim_end_matches('\n') == name {
            return true;
        }
    }

    match fs::read(proc_dir.join("cmdline")) {
        Ok(raw) => cmdline_matches(&raw, name),
        Err(_) => false,
    }
}

/// Check the first two NUL-separated arguments of a `/proc/<pid>/cmdline`.
pub(crate) fn cmdline_matches(raw: &[u8], name: &str) -> bool {
    raw.split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .take(2)
        .any(|arg| {
            let arg = String::from_utf8_lossy(arg);
            Path::new(arg.as_ref())
                .file_name()
                .map(|base| base == name)
                .unwrap_or(false)
        })
}
