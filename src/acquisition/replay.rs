//! CSV session replay.

use super::{AcquisitionError, SampleSource};
use crate::types::Sample;
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Replays samples recorded as `timestamp,red,green[,finger]` rows.
///
/// A header line and blank lines are skipped. The optional fourth column is
/// the finger flag (`0`/`1`); absent, the finger is assumed present.
#[derive(Debug)]
pub struct CsvReplaySource {
    samples: std::vec::IntoIter<Sample>,
}

impl CsvReplaySource {
    /// Parse the whole file up front so malformed rows fail at load time
    /// rather than mid-session.
    pub fn load(path: &Path) -> Result<Self, AcquisitionError> {
        let contents = std::fs::read_to_string(path)?;
        let mut samples = Vec::new();

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // Header row: first field is not numeric
            if index == 0 && line.split(',').next().is_some_and(|f| f.trim().parse::<i64>().is_err())
            {
                continue;
            }
            samples.push(parse_line(line, index + 1)?);
        }

        info!(path = %path.display(), samples = samples.len(), "Loaded replay file");
        Ok(Self {
            samples: samples.into_iter(),
        })
    }
}

fn parse_line(line: &str, line_number: usize) -> Result<Sample, AcquisitionError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 3 {
        return Err(AcquisitionError::Malformed {
            line: line_number,
            reason: format!("expected at least 3 fields, got {}", fields.len()),
        });
    }

    let timestamp_ms = fields[0]
        .parse::<i64>()
        .map_err(|e| AcquisitionError::Malformed {
            line: line_number,
            reason: format!("bad timestamp: {e}"),
        })?;
    let red_mean = fields[1]
        .parse::<f64>()
        .map_err(|e| AcquisitionError::Malformed {
            line: line_number,
            reason: format!("bad red value: {e}"),
        })?;
    let green_mean = fields[2]
        .parse::<f64>()
        .map_err(|e| AcquisitionError::Malformed {
            line: line_number,
            reason: format!("bad green value: {e}"),
        })?;
    let finger_present = match fields.get(3) {
        None => true,
        Some(&"1") => true,
        Some(&"0") => false,
        Some(other) => {
            return Err(AcquisitionError::Malformed {
                line: line_number,
                reason: format!("bad finger flag: {other:?}"),
            })
        }
    };

    Ok(Sample {
        timestamp_ms,
        red_mean,
        green_mean,
        finger_present,
    })
}

#[async_trait]
impl SampleSource for CsvReplaySource {
    async fn next_sample(&mut self) -> Result<Option<Sample>, AcquisitionError> {
        Ok(self.samples.next())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn replays_rows_in_order() {
        let file = write_file("timestamp,red,green\n0,180.5,120.25\n10,181.0,121.0,0\n");
        let mut source = CsvReplaySource::load(file.path()).unwrap();

        let first = source.next_sample().await.unwrap().unwrap();
        assert_eq!(first.timestamp_ms, 0);
        assert!((first.red_mean - 180.5).abs() < 1e-12);
        assert!(first.finger_present);

        let second = source.next_sample().await.unwrap().unwrap();
        assert_eq!(second.timestamp_ms, 10);
        assert!(!second.finger_present);

        assert!(source.next_sample().await.unwrap().is_none());
    }

    #[test]
    fn headerless_file_loads() {
        let file = write_file("0,180,120\n10,181,121\n");
        let mut source = CsvReplaySource::load(file.path()).unwrap();
        assert!(source.samples.next().is_some());
        assert!(source.samples.next().is_some());
        assert!(source.samples.next().is_none());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let file = write_file("timestamp,red,green\n\n0,180,120\n\n");
        let source = CsvReplaySource::load(file.path()).unwrap();
        assert_eq!(source.samples.len(), 1);
    }

    #[test]
    fn malformed_row_reports_line_number() {
        let file = write_file("timestamp,red,green\n0,180,120\nnot-a-number,1,2\n");
        let err = CsvReplaySource::load(file.path()).unwrap_err();
        match err {
            AcquisitionError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn source_is_debug_formattable() {
        let file = write_file("0,180,120\n");
        let source = CsvReplaySource::load(file.path()).unwrap();
        let rendered = format!("{source:?}");
        assert!(rendered.contains("CsvReplaySource"));
    }

    #[test]
    fn short_row_is_rejected() {
        let file = write_file("0,180\n");
        assert!(CsvReplaySource::load(file.path()).is_err());
    }
}
