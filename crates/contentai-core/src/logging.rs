//! Raw stream transcripts.
//!
//! When a log directory is configured, every request body and every NDJSON
//! line received for a session is appended to `{log_dir}/{session_id}.log`.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::Utc;

use crate::session::SessionId;

/// Which side of the exchange a transcript line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Received,
    Error,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Request => "REQUEST",
            Direction::Received => "RECV",
            Direction::Error => "ERROR",
        }
    }
}

/// Thread-safe, append-only transcript for one session.
///
/// A transcript without a backing file silently discards writes.
#[derive(Clone, Default)]
pub struct Transcript {
    file: Arc<Mutex<Option<File>>>,
}

impl Transcript {
    /// Transcript that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Open (or create) `{log_dir}/{session_id}.log`.
    ///
    /// Falls back to a disabled transcript if the file can't be opened.
    pub fn open(log_dir: Option<&str>, session_id: &SessionId) -> Self {
        let file = log_dir.and_then(|dir| {
            std::fs::create_dir_all(dir).ok()?;
            let path = Path::new(dir).join(format!("{}.log", session_id));
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Some(file),
                Err(e) => {
                    log::warn!("Failed to open transcript {}: {}", path.display(), e);
                    None
                }
            }
        });
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.lock().map(|f| f.is_some()).unwrap_or(false)
    }

    /// Write a timestamped line.
    pub fn record(&self, direction: Direction, data: &str) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = writeln!(file, "[{}] {}: {}", utc_timestamp(), direction.label(), data);
                let _ = file.flush();
            }
        }
    }
}

/// Current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
