//! Helpers for keeping player-supplied text on a single log line.
//!
//! Command lines and dialog fields come straight from clients, so anything that
//! reaches a log record is escaped and length-capped first.

use std::fmt::Write;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Longest preview (in chars) of a single logged value.
const MAX_PREVIEW: usize = 160;

/// Escape control characters and cap the length of `s` for logging.
///
/// Newlines, tabs and carriage returns become `\n`, `\t`, `\r`; other control
/// characters are written as `\xNN`. Game colour codes (backticks) are kept.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 4);
    for (n, ch) in s.chars().enumerate() {
        if n == MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Render command arguments as `[a, b, c]` with each entry escaped.
pub fn escape_args(args: &[String]) -> String {
    let parts: Vec<String> = args.iter().map(|a| escape_log(a)).collect();
    format!("[{}]", parts.join(", "))
}

/// Log target whose records are also copied to the security log.
pub const SECURITY_TARGET: &str = "security";

/// File destinations for formatted log lines.
///
/// The main file receives every line. Lines logged on [`SECURITY_TARGET`]
/// are appended to the security file as well, whether or not a main file is
/// configured.
#[derive(Debug, Default)]
pub struct LogSinks {
    file: Option<Mutex<File>>,
    security_path: Option<PathBuf>,
}

impl LogSinks {
    /// Open the main file (append mode). A file that cannot be opened is
    /// skipped and the terminal stays the only main destination.
    pub fn open(file: Option<&Path>, security_path: Option<PathBuf>) -> Self {
        let file = file.and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
                .map(Mutex::new)
        });
        Self { file, security_path }
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// Append `line` to the sinks that want records from `target`.
    pub fn write(&self, target: &str, line: &str) {
        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                let _ = writeln!(guard, "{}", line);
            }
        }
        if target == SECURITY_TARGET {
            if let Some(path) = &self.security_path {
                if let Ok(mut sf) = OpenOptions::new().create(true).append(true).open(path) {
                    let _ = writeln!(sf, "{}", line);
                }
            }
        }
    }
}
