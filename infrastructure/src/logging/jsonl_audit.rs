//! JSONL file writer for audit events.
//!
//! Each [`AuditEvent`] becomes a single JSON line carrying its payload plus
//! `type`, `timestamp` and a per-process `seq`. The file is opened in append
//! mode so one trail spans every run of the day.

use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;
use tradegate_application::{AuditEvent, AuditLogger};

struct Sink {
    writer: BufWriter<File>,
    seq: u64,
}

/// Audit logger that appends one JSON object per line.
///
/// Thread-safe via a `Mutex`; every record is flushed as it is written.
pub struct JsonlAuditLogger {
    sink: Mutex<Sink>,
    path: PathBuf,
}

impl JsonlAuditLogger {
    /// Open (or create) the trail at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Mutex::new(Sink {
                writer: BufWriter::new(file),
                seq: 0,
            }),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: AuditEvent, seq: u64) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut map = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert("type".to_string(), Value::String(event.event_type.to_string()));
        map.insert("timestamp".to_string(), Value::String(timestamp));
        map.insert("seq".to_string(), Value::from(seq));
        Value::Object(map)
    }
}

impl AuditLogger for JsonlAuditLogger {
    fn log(&self, event: AuditEvent) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.seq += 1;
        let event_type = event.event_type;
        let record = Self::record(event, sink.seq);

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        let written = writeln!(sink.writer, "{}", line).and_then(|_| sink.writer.flush());
        if let Err(e) = written {
            warn!(path = %self.path.display(), event = event_type, error = %e, "Audit write failed");
        }
    }
}

impl Drop for JsonlAuditLogger {
    fn drop(&mut self) {
        let sink = self.sink.get_mut().unwrap_or_else(PoisonError::into_inner);
        let _ = sink.writer.flush();
    }
}
