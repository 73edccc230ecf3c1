//! Statistics processing and output
// (c) 2024 Ross Younger

use human_repr::{HumanCount, HumanDuration, HumanThroughput};
use std::{fmt::Display, time::Duration};
use tracing::info;

use crate::client::TransferReport;

/// Human friendly output helper
#[derive(Debug, Clone, Copy)]
pub struct DataRate {
    /// Bytes per second; if None, we were unable to compute a rate.
    rate: Option<f64>,
}

impl DataRate {
    /// Constructor
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(bytes: u64, time: Option<Duration>) -> Self {
        match time {
            None => Self { rate: None },
            Some(time) if time.is_zero() => Self { rate: None }, // divide by zero is not meaningful
            Some(time) => Self {
                rate: Some((bytes as f64) / time.as_secs_f64()),
            },
        }
    }
    /// Accessor
    #[must_use]
    pub fn byte_rate(&self) -> Option<f64> {
        self.rate
    }
}

impl Display for DataRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.byte_rate() {
            None => f.write_str("unknown"),
            Some(rate) => rate.human_throughput_bytes().fmt(f),
        }
    }
}

/// The one-line summary of a transfer
#[must_use]
pub fn summary(report: &TransferReport) -> String {
    let bytes = report.total_bytes();
    let size = bytes.human_count("B");
    let rate = DataRate::new(bytes, Some(report.elapsed));
    let files = match report.files.len() {
        1 => "1 file".to_string(),
        n => format!("{n} files"),
    };
    format!(
        "Transferred {size} ({files}) in {}; average {rate}",
        report.elapsed.human_duration()
    )
}

/// Reports on a completed transfer via tracing
pub(crate) fn output_statistics(report: &TransferReport, per_file: bool) {
    if per_file {
        for file in &report.files {
            info!(
                "{} -> {}: {}",
                file.local.display(),
                file.remote,
                file.bytes.human_count_bytes()
            );
        }
    }
    info!("{}", summary(report));
}

#[cfg(test)]
mod tests {
    use super::{summary, DataRate};
    use crate::client::{FileReport, TransferReport};
    use std::time::Duration;

    #[test]
    fn unknown() {
        let r = DataRate::new(1234, None);
        assert_eq!(format!("{r}"), "unknown");
    }
    #[test]
    fn zero() {
        let r = DataRate::new(1234, Some(Duration::from_secs(0)));
        assert_eq!(format!("{r}"), "unknown");
    }

    fn test_case(bytes: u64, time: u64, expect: &str) {
        let r = DataRate::new(bytes, Some(Duration::from_secs(time)));
        assert_eq!(format!("{r}"), expect);
    }
    #[test]
    fn valid() {
        test_case(42, 1, "42B/s");
        test_case(1234, 1, "1.2kB/s");
        test_case(10_000_000_000, 500, "20MB/s");
    }

    #[test]
    fn summary_line() {
        let report = TransferReport {
            files: vec![
                FileReport {
                    local: "a".into(),
                    remote: "/tmp/a".into(),
                    bytes: 1500,
                },
                FileReport {
                    local: "b".into(),
                    remote: "/tmp/b".into(),
                    bytes: 500,
                },
            ],
            elapsed: Duration::from_secs(2),
        };
        let s = summary(&report);
        assert!(s.starts_with("Transferred 2kB (2 files) in "), "{s}");
        assert!(s.ends_with("; average 1kB/s"), "{s}");
    }
}
