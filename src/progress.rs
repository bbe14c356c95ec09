//! Upload progress reporting.
//!
//! Renders [`UploadEvent`]s from an upload session so users see what is
//! queued, retrying, and done. Progress is emitted on **stderr** so stdout
//! remains parseable for scripts.

use std::io::Write;

use crate::upload::{UploadCounters, UploadEvent};

/// Renders upload events. Implementations write to stderr (human or JSON).
pub trait UploadProgressReporter: Send + Sync {
    fn report(&self, event: &UploadEvent);

    /// Final tally once every file has been processed.
    fn finish(&self, counters: &UploadCounters);
}

/// Human-friendly progress on stderr: "upload report.pdf  retrying in 500 ms (attempt 1: ...)".
pub struct StderrProgress;

fn human_line(event: &UploadEvent) -> String {
    match event {
        UploadEvent::Queued { file_name } => format!("upload {}  queued\n", file_name),
        UploadEvent::Started { file_name, attempt } => {
            if *attempt == 1 {
                format!("upload {}  uploading\n", file_name)
            } else {
                format!("upload {}  uploading (attempt {})\n", file_name, attempt)
            }
        }
        UploadEvent::Retrying {
            file_name,
            attempt,
            delay_ms,
            error,
        } => format!(
            "upload {}  retrying in {} ms (attempt {}: {})\n",
            file_name,
            format_number(*delay_ms),
            attempt,
            error
        ),
        UploadEvent::Completed {
            file_name,
            id,
            storage_path,
        } => format!("upload {}  done  {} -> {}\n", file_name, id, storage_path),
        UploadEvent::Failed { file_name, error } => {
            format!("upload {}  FAILED  {}\n", file_name, error)
        }
    }
}

impl UploadProgressReporter for StderrProgress {
    fn report(&self, event: &UploadEvent) {
        let line = human_line(event);
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }

    fn finish(&self, counters: &UploadCounters) {
        let _ = writeln!(
            std::io::stderr().lock(),
            "upload finished  {} completed, {} failed",
            format_number(counters.completed as u64),
            format_number(counters.failed as u64)
        );
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl UploadProgressReporter for JsonProgress {
    fn report(&self, event: &UploadEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }

    fn finish(&self, counters: &UploadCounters) {
        let obj = serde_json::json!({
            "event": "finished",
            "completed": counters.completed,
            "failed": counters.failed,
        });
        let _ = writeln!(std::io::stderr().lock(), "{}", obj);
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl UploadProgressReporter for NoProgress {
    fn report(&self, _event: &UploadEvent) {}
    fn finish(&self, _counters: &UploadCounters) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn UploadProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn human_lines() {
        let retry = UploadEvent::Retrying {
            file_name: "a.pdf".to_string(),
            attempt: 2,
            delay_ms: 1000,
            error: "timeout".to_string(),
        };
        assert_eq!(
            human_line(&retry),
            "upload a.pdf  retrying in 1,000 ms (attempt 2: timeout)\n"
        );
        let started = UploadEvent::Started {
            file_name: "a.pdf".to_string(),
            attempt: 1,
        };
        assert_eq!(human_line(&started), "upload a.pdf  uploading\n");
    }

    #[test]
    fn json_event_shape() {
        let done = UploadEvent::Completed {
            file_name: "a.pdf".to_string(),
            id: "123".to_string(),
            storage_path: "uploads/123/a.pdf".to_string(),
        };
        let v: serde_json::Value = serde_json::to_value(&done).unwrap();
        assert_eq!(v["event"], "completed");
        assert_eq!(v["file_name"], "a.pdf");
        assert_eq!(v["storage_path"], "uploads/123/a.pdf");
    }
}
