use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::catalogue::{Action, TaskResult};

const TELEMETRY_SERVICES: [&str; 2] = ["DiagTrack", "dmwappushservice"];
const HDD_MEDIA_TYPE: &str = "3";

// Windows maintenance units. Failures of the underlying commands are reported
// as advisory messages on a successful result.

pub struct CleanTempFiles;

impl Action for CleanTempFiles {
    fn run(&self) -> TaskResult {
        let roots = [env::var_os("TEMP").map(PathBuf::from), windir_path(&["Temp"])];
        let purged: usize = roots.iter().flatten().map(|root| purge_dir(root)).sum();
        TaskResult::ok(format!("{purged} items purged"))
    }
}

pub struct CleanComponentStore;

impl Action for CleanComponentStore {
    fn run(&self) -> TaskResult {
        let args = [
            "/online",
            "/cleanup-image",
            "/startcomponentcleanup",
            "/norestart",
        ];
        if run_quiet("dism", &args) {
            TaskResult::ok("WinSxS optimized")
        } else {
            TaskResult::ok("DISM cleanup finished (or nothing to do)")
        }
    }
}

pub struct ClearPrefetch;

impl Action for ClearPrefetch {
    fn run(&self) -> TaskResult {
        let removed = windir_path(&["Prefetch"])
            .map(|dir| purge_files_with_extension(&dir, "pf"))
            .unwrap_or(0);
        TaskResult::ok(format!("Prefetch cleared ({removed})"))
    }
}

pub struct DefragHdd;

impl Action for DefragHdd {
    fn run(&self) -> TaskResult {
        let media_type = Command::new("powershell")
            .args([
                "-NoProfile",
                "-Command",
                "(Get-PhysicalDisk -DeviceId 0).MediaType",
            ])
            .stderr(Stdio::null())
            .output();
        let is_hdd = match media_type {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim() == HDD_MEDIA_TYPE
            }
            Ok(_) => false,
            Err(err) => {
                debug!(error = %err, "disk media probe failed");
                false
            }
        };
        if !is_hdd {
            return TaskResult::ok("SSD detected (skipped)");
        }
        run_quiet("defrag", &["C:", "/U", "/X"]);
        TaskResult::ok("HDD optimized")
    }
}

pub struct ResetNetworkStack;

impl Action for ResetNetworkStack {
    fn run(&self) -> TaskResult {
        let commands: [(&str, &[&str]); 3] = [
            ("ipconfig", &["/flushdns"]),
            ("netsh", &["winsock", "reset"]),
            ("netsh", &["int", "ip", "reset"]),
        ];
        thread::scope(|scope| {
            for (program, args) in commands {
                scope.spawn(move || run_quiet(program, args));
            }
        });
        TaskResult::ok("Network stack reset")
    }
}

pub struct CleanUpdateCache;

impl Action for CleanUpdateCache {
    fn run(&self) -> TaskResult {
        let purged = windir_path(&["SoftwareDistribution", "Download"])
            .map(|dir| purge_dir(&dir))
            .unwrap_or(0);
        TaskResult::ok(format!("Update cache cleaned ({purged})"))
    }
}

pub struct DisableTelemetry;

impl Action for DisableTelemetry {
    fn run(&self) -> TaskResult {
        let stopped = AtomicUsize::new(0);
        thread::scope(|scope| {
            for service in TELEMETRY_SERVICES {
                let stopped = &stopped;
                scope.spawn(move || {
                    if run_quiet("sc", &["stop", service]) {
                        stopped.fetch_add(1, Ordering::Relaxed);
                        run_quiet("sc", &["config", service, "start=", "disabled"]);
                    }
                });
            }
        });
        TaskResult::ok(format!(
            "Telemetry adjusted ({})",
            stopped.load(Ordering::Relaxed)
        ))
    }
}

pub struct VerifySystemFiles;

impl Action for VerifySystemFiles {
    fn run(&self) -> TaskResult {
        if run_quiet("sfc", &["/verifyonly"]) {
            TaskResult::ok("Integrity verified")
        } else {
            TaskResult::ok("Verification performed")
        }
    }
}

/// Stand-in unit used by `--dry-run`: sleeps, then reports a fixed message.
pub struct SimulatedAction {
    delay: Duration,
    message: String,
}

impl SimulatedAction {
    pub fn new(delay: Duration, message: impl Into<String>) -> Self {
        Self {
            delay,
            message: message.into(),
        }
    }
}

impl Action for SimulatedAction {
    fn run(&self) -> TaskResult {
        thread::sleep(self.delay);
        TaskResult::ok(self.message.clone())
    }
}

fn windir_path(parts: &[&str]) -> Option<PathBuf> {
    let mut path = PathBuf::from(env::var_os("WINDIR")?);
    path.extend(parts);
    Some(path)
}

/// Runs a command with its output discarded. Returns whether it exited successfully.
fn run_quiet<S: AsRef<OsStr>>(program: &str, args: &[S]) -> bool {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) => {
            debug!(program, code = ?status.code(), "command finished");
            status.success()
        }
        Err(err) => {
            debug!(program, error = %err, "command failed to start");
            false
        }
    }
}

/// Removes every entry directly under `root`, returning how many were removed.
/// An unreadable root counts as nothing removed.
pub fn purge_dir(root: &Path) -> usize {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|entry| {
            let path = entry.path();
            let removed = match entry.file_type() {
                Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };
            removed.is_ok()
        })
        .count()
}

pub fn purge_files_with_extension(dir: &Path, extension: &str) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .filter(|path| fs::remove_file(path).is_ok())
        .count()
}
