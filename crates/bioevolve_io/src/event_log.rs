//! Append-only JSONL stream of lineage events.

use crate::error::{IoError, Result};
use bioevolve_data::LineageEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One log line: the event plus the wall-clock time it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub recorded_at: DateTime<Utc>,
    pub event: LineageEvent,
}

pub struct EventLog {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    written: usize,
}

impl EventLog {
    /// Opens `path` for appending, creating it and its directory if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path.as_ref(), false)
    }

    /// Starts a fresh log at `path`, discarding any previous content.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, truncate: bool) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options
            .open(path)
            .map_err(|e| IoError::FileSystem(e).during(format!("opening {:?}", path)))?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// A log that accepts and drops events.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            writer: None,
            path: PathBuf::new(),
            written: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Events appended through this handle.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Appends `events` in order and flushes.
    pub fn append(&mut self, events: &[LineageEvent]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let recorded_at = Utc::now();
        for event in events {
            let line = serde_json::to_string(&LoggedEvent {
                recorded_at,
                event: event.clone(),
            })?;
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        self.written += events.len();
        Ok(())
    }
}

/// Reads every well-formed line of a log. Malformed lines are skipped.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<LoggedEvent>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(IoError::FileSystem(e)),
    };
    let mut events = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LoggedEvent>(&line) {
            Ok(logged) => events.push(logged),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = number + 1,
                error = %e,
                "Skipping malformed event log line"
            ),
        }
    }
    Ok(events)
}
