pub const ELEVATION_WARNING: &str =
    "WARNING: run as Administrator for full speed and complete permissions.";

/// Whether the process holds administrative rights. Consulted once at startup.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    // Raw disk handles can only be opened by elevated processes.
    std::fs::File::open(r"\\.\PHYSICALDRIVE0").is_ok()
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .map(|output| {
            output.status.success() && is_root_uid(&String::from_utf8_lossy(&output.stdout))
        })
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn is_root_uid(raw: &str) -> bool {
    raw.trim() == "0"
}
