//! Thin adb shell-outs
//!
//! Device control is delegated entirely to the `adb` tool; this module only
//! spawns it, streams its merged output line by line, and interprets the
//! handful of answers the rest of the system needs (reboot targets, props,
//! the connected device's codename).

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Outcome of one streamed command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub lines: Vec<String>,
}

impl CommandResult {
    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawns a command and feeds every output line (stdout and stderr
/// interleaved) through `on_line` as it arrives. A spawn failure is
/// reported as a synthetic `ERROR: …` line with exit code 127 rather than
/// an error, so callers handle "adb missing" like any other tool output.
pub async fn run_stream<F>(program: &str, args: &[&str], mut on_line: F) -> CommandResult
where
    F: FnMut(&str),
{
    debug!("running: {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            let message = format!("ERROR: {e}");
            on_line(&message);
            return CommandResult {
                exit_code: 127,
                lines: vec![message],
            };
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        on_line(&line);
        lines.push(line);
    }

    let exit_code = match child.wait().await {
        Ok(status) => status.code().unwrap_or(-1),
        Err(_) => -1,
    };

    CommandResult { exit_code, lines }
}

/// Reboot destinations adb understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootTarget {
    System,
    Recovery,
    Bootloader,
    /// Samsung download/Odin mode.
    Download,
}

impl RebootTarget {
    fn arg(self) -> Option<&'static str> {
        match self {
            RebootTarget::System => None,
            RebootTarget::Recovery => Some("recovery"),
            RebootTarget::Bootloader => Some("bootloader"),
            RebootTarget::Download => Some("download"),
        }
    }
}

pub async fn reboot(target: RebootTarget) -> CommandResult {
    let mut args = vec!["reboot"];
    if let Some(mode) = target.arg() {
        args.push(mode);
    }
    run_stream("adb", &args, |_| {}).await
}

/// Reads one system property, filtering out the noise adb prints when no
/// usable device is attached.
pub async fn getprop(name: &str) -> Option<String> {
    let result = run_stream("adb", &["shell", "getprop", name], |_| {}).await;
    if !result.success() {
        return None;
    }

    let value = result.last_line()?.trim();
    if value.is_empty() {
        return None;
    }

    let lowered = value.to_lowercase();
    if lowered.starts_with("error:")
        || lowered.contains("no devices")
        || lowered.contains("device offline")
        || lowered.contains("unauthorized")
    {
        return None;
    }

    Some(value.to_string())
}

/// Codename of the currently connected device, if any.
pub async fn connected_codename() -> Option<String> {
    for prop in ["ro.build.product", "ro.product.device"] {
        if let Some(value) = getprop(prop).await {
            return Some(value);
        }
    }
    None
}

/// Image kinds the flashing flow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashImageKind {
    Boot,
    Recovery,
}

/// A classified flashable image with its canonical partition filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashImage {
    pub kind: FlashImageKind,
    pub partition_filename: &'static str,
}

/// Images that must never be flashed through this flow.
const DENY_PREFIXES: [&str; 6] = [
    "vendor_boot",
    "init_boot",
    "vbmeta",
    "dtbo",
    "super",
    "bootloader",
];

/// Classifies a filename as a boot or recovery image; anything ambiguous or
/// deny-listed is rejected.
pub fn classify_flash_image(filename: &str) -> Option<FlashImage> {
    let base = filename.trim().to_lowercase();
    if base.is_empty() {
        return None;
    }

    if base.ends_with(".img") && DENY_PREFIXES.iter().any(|p| base.starts_with(p)) {
        return None;
    }

    if base == "boot.img" || base.ends_with("-boot.img") {
        return Some(FlashImage {
            kind: FlashImageKind::Boot,
            partition_filename: "boot.img",
        });
    }

    if base == "recovery.img" || base.ends_with("-recovery.img") {
        return Some(FlashImage {
            kind: FlashImageKind::Recovery,
            partition_filename: "recovery.img",
        });
    }

    if base.ends_with(".img") && base.contains("recovery") {
        return Some(FlashImage {
            kind: FlashImageKind::Recovery,
            partition_filename: "recovery.img",
        });
    }

    None
}
