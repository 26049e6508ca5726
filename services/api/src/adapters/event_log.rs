//! services/api/src/adapters/event_log.rs
//!
//! The file-backed access log. Each event is one line of the form
//! `[YYYY-mm-dd HH:MM:SS] username: event`, appended in local time.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use translation_workflow_core::domain::AccessEvent;
use translation_workflow_core::ports::{EventLog, PortError, PortResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An `EventLog` that appends to a plain text file.
pub struct FileEventLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

fn format_line(timestamp: &str, username: &str, event: &str) -> String {
    // Events never span lines.
    let event = event.replace(['\r', '\n'], " ");
    format!("[{}] {}: {}\n", timestamp, username, event)
}

/// Parses one log line. Returns `None` for anything not in the expected shape.
fn parse_line(line: &str) -> Option<AccessEvent> {
    let rest = line.strip_prefix('[')?;
    let (timestamp, rest) = rest.split_once("] ")?;
    let (username, event) = rest.split_once(": ")?;
    Some(AccessEvent {
        timestamp: timestamp.to_string(),
        username: username.to_string(),
        event: event.trim_end().to_string(),
    })
}

#[async_trait]
impl EventLog for FileEventLog {
    async fn record_event(&self, username: &str, event: &str) -> PortResult<()> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let line = format_line(&timestamp, username, event);

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to open access log: {}", e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write access log: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!("Access log: {} {}", username, event);
        Ok(())
    }

    async fn read_events(&self) -> PortResult<Vec<AccessEvent>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "Failed to read access log: {}",
                    e
                )))
            }
        };
        Ok(raw.lines().filter_map(parse_line).collect())
    }
}
