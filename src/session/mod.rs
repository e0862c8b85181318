//! Session recording and export.
//!
//! The recorder drains the pipeline's session channel into an in-memory
//! [`Session`], which can then be serialized to CSV or JSON and written to
//! disk. Export failures never destroy the in-memory rows — the caller can
//! retry against another path.

use crate::types::SessionRow;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Fixed CSV header, matching the interchange field order
const CSV_HEADER: &str =
    "timestamp,datetime,raw_value,filtered_value,peak_flag,bpm_instant,spo2_estimate,signal_quality";

const EXPORT_FORMAT: &str = "PPG Vital Signs Data";
const EXPORT_VERSION: &str = "1.0.0";
const DISCLAIMER: &str =
    "This data is for reference only and should not be used for medical diagnosis.";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("session contains no rows")]
    Empty,

    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// Session
// ============================================================================

/// One recorded monitoring session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Identifier derived from the start timestamp
    pub id: String,
    /// Wall-clock start, milliseconds since the Unix epoch
    pub start_ms: i64,
    /// Wall-clock end, milliseconds since the Unix epoch
    pub end_ms: i64,
    /// Rows in arrival order
    pub rows: Vec<SessionRow>,
}

impl Session {
    pub fn new(start_ms: i64) -> Self {
        Self {
            id: format!("session-{start_ms}"),
            start_ms,
            end_ms: start_ms,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: SessionRow) {
        self.end_ms = row.timestamp;
        self.rows.push(row);
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end_ms - self.start_ms).max(0)
    }

    /// Render the session as CSV with the fixed interchange header.
    ///
    /// Floats carry six decimals, the peak flag is `0`/`1`, and the
    /// datetime column is RFC 3339 with millisecond precision.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        if self.rows.is_empty() {
            return Err(ExportError::Empty);
        }

        let mut out = String::with_capacity(self.rows.len() * 80);
        out.push_str(CSV_HEADER);
        out.push('\n');
        for row in &self.rows {
            let datetime = format_datetime(row.timestamp);
            out.push_str(&format!(
                "{},{},{:.6},{:.6},{},{},{},{}\n",
                row.timestamp,
                datetime,
                row.raw_value,
                row.filtered_value,
                u8::from(row.peak_flag),
                row.bpm_instant,
                row.spo2_estimate,
                row.signal_quality,
            ));
        }
        Ok(out)
    }

    /// Render the session as the versioned JSON export document.
    pub fn to_json(&self) -> Result<String, ExportError> {
        if self.rows.is_empty() {
            return Err(ExportError::Empty);
        }

        let document = json!({
            "session": {
                "id": self.id,
                "startTime": self.start_ms,
                "endTime": self.end_ms,
                "duration": self.duration_ms(),
                "dataPoints": self.rows.len(),
            },
            "metadata": {
                "exportTime": format_datetime(Utc::now().timestamp_millis()),
                "version": EXPORT_VERSION,
                "format": EXPORT_FORMAT,
                "disclaimer": DISCLAIMER,
            },
            "data": self.rows.iter().map(|row| json!({
                "timestamp": row.timestamp,
                "datetime": format_datetime(row.timestamp),
                "measurements": {
                    "rawPPG": row.raw_value,
                    "filteredPPG": row.filtered_value,
                    "isPeak": row.peak_flag,
                    "heartRate": row.bpm_instant,
                    "spo2": row.spo2_estimate,
                    "signalQuality": row.signal_quality,
                },
            })).collect::<Vec<_>>(),
        });

        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Write both export formats into `dir`, returning the file paths.
    ///
    /// Filenames embed the export time with `:` and `.` replaced by `-` so
    /// they stay valid on every filesystem.
    pub fn export_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf), ExportError> {
        let stamp = format_datetime(Utc::now().timestamp_millis()).replace([':', '.'], "-");
        let base = format!("vital_signs_session_{stamp}");

        let csv_path = dir.join(format!("{base}.csv"));
        let json_path = dir.join(format!("{base}.json"));

        std::fs::write(&csv_path, self.to_csv()?)?;
        std::fs::write(&json_path, self.to_json()?)?;

        info!(
            csv = %csv_path.display(),
            json = %json_path.display(),
            rows = self.rows.len(),
            "Session exported"
        );
        Ok((csv_path, json_path))
    }
}

fn format_datetime(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp_millis(0).unwrap_or_else(Utc::now))
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Recorder
// ============================================================================

/// Drains the pipeline's session channel into a [`Session`].
pub struct SessionRecorder {
    session: Session,
    rx: mpsc::Receiver<SessionRow>,
}

impl SessionRecorder {
    pub fn new(start_ms: i64, rx: mpsc::Receiver<SessionRow>) -> Self {
        Self {
            session: Session::new(start_ms),
            rx,
        }
    }

    /// Consume rows until the channel closes, then return the session.
    pub async fn run(mut self) -> Session {
        while let Some(row) = self.rx.recv().await {
            self.session.push(row);
        }
        if self.session.rows.is_empty() {
            warn!("Recorder finished with an empty session");
        } else {
            info!(rows = self.session.rows.len(), "Recorder finished");
        }
        self.session
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp: i64, peak: bool) -> SessionRow {
        SessionRow {
            timestamp,
            raw_value: 120.5,
            filtered_value: 0.125,
            peak_flag: peak,
            bpm_instant: 72,
            spo2_estimate: 97,
            signal_quality: 80,
        }
    }

    fn session_with_rows() -> Session {
        let mut s = Session::new(1_700_000_000_000);
        s.push(row(1_700_000_000_000, false));
        s.push(row(1_700_000_000_010, true));
        s
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let csv = session_with_rows().to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].ends_with(",0,72,97,80"));
        assert!(lines[2].contains(",1,72,97,80"));
        // Floats carry six decimals
        assert!(lines[1].contains("120.500000"));
        assert!(lines[1].contains("0.125000"));
    }

    #[test]
    fn csv_datetime_is_rfc3339_millis() {
        let csv = session_with_rows().to_csv().unwrap();
        let second_field = csv.lines().nth(1).unwrap().split(',').nth(1).unwrap();
        assert_eq!(second_field, "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn empty_session_refuses_export() {
        let s = Session::new(0);
        assert!(matches!(s.to_csv(), Err(ExportError::Empty)));
        assert!(matches!(s.to_json(), Err(ExportError::Empty)));
    }

    #[test]
    fn json_document_structure() {
        let json_text = session_with_rows().to_json().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&json_text).unwrap();

        assert_eq!(doc["metadata"]["format"], EXPORT_FORMAT);
        assert_eq!(doc["metadata"]["version"], EXPORT_VERSION);
        assert_eq!(doc["metadata"]["disclaimer"], DISCLAIMER);
        assert!(!doc["metadata"]["exportTime"].is_null());
        assert_eq!(doc["session"]["duration"], 10);
        assert_eq!(doc["session"]["dataPoints"], 2);
        assert_eq!(doc["data"][0]["datetime"], "2023-11-14T22:13:20.000Z");

        let first = &doc["data"][0]["measurements"];
        for key in [
            "rawPPG",
            "filteredPPG",
            "isPeak",
            "heartRate",
            "spo2",
            "signalQuality",
        ] {
            assert!(!first[key].is_null(), "missing measurement key {key}");
        }
    }

    #[test]
    fn export_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let (csv_path, json_path) = session_with_rows().export_to_dir(dir.path()).unwrap();
        assert!(csv_path.exists());
        assert!(json_path.exists());
        let name = csv_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("vital_signs_session_"));
        assert!(!name.contains(':'));
    }

    #[tokio::test]
    async fn recorder_collects_until_channel_closes() {
        let (tx, rx) = mpsc::channel(16);
        let recorder = SessionRecorder::new(0, rx);
        let handle = tokio::spawn(recorder.run());

        for i in 0..5 {
            tx.send(row(i * 10, false)).await.unwrap();
        }
        drop(tx);

        let session = handle.await.unwrap();
        assert_eq!(session.rows.len(), 5);
        assert_eq!(session.end_ms, 40);
    }
}
