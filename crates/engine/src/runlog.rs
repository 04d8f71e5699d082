//! Per-run JSONL log artifact (`run.log.jsonl`), unlike stdout-only
//! logging: no sensitive parameter may ever appear in *any* log
//! artifact, so every line written here passes through
//! [`eatc_http::redact`]'s `redact()` before hitting disk, same rule set
//! the HTTP substrate already applies to its own tracing fields.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use eatc_common::error::EatcError;
use eatc_http::redact::redact;

/// Append-only writer for the run's JSONL log artifact. One line per
/// significant pipeline event; never buffers across process exit (each
/// `record` call flushes immediately) so a run that's killed mid-flight
/// still leaves a readable partial log.
pub struct RunLog {
    file: Mutex<File>,
}

impl RunLog {
    pub fn open(output_dir: &Path) -> Result<Self, EatcError> {
        std::fs::create_dir_all(output_dir).map_err(|e| EatcError::OutputWrite(e.to_string()))?;
        let path = output_dir.join("run.log.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EatcError::OutputWrite(format!("opening {}: {e}", path.display())))?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Record one structured event: `component` (e.g. "fanout", "gates"),
    /// `message`, and arbitrary extra fields merged in.
    pub fn record(&self, component: &str, message: &str, fields: Value) {
        #[derive(Serialize)]
        struct Line<'a> {
            ts: String,
            component: &'a str,
            message: &'a str,
            #[serde(flatten)]
            fields: Value,
        }
        let line = Line { ts: Utc::now().to_rfc3339(), component, message, fields };
        let Ok(mut serialized) = serde_json::to_string(&line) else { return };
        serialized = redact(&serialized);
        serialized.push('\n');
        if let Ok(mut guard) = self.file.lock() {
            let _ = guard.write_all(serialized.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_api_keys_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::open(dir.path()).unwrap();
        log.record("fanout", "provider call", json!({"url": "https://example.com/search?api_key=sk_live_12345"}));
        let contents = std::fs::read_to_string(dir.path().join("run.log.jsonl")).unwrap();
        assert!(!contents.contains("sk_live_12345"));
        assert!(contents.contains("REDACTED"));
    }
}
