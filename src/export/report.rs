use crate::error::{MalDumpError, Result};
use crate::export::pipeline::{CollectedStore, ExportSummary, OutputKind};
use crate::export::staging;
use crate::quarantine::Entry;

use serde::Serialize;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of the metadata report. Kept in sync with [`ReportRow`].
pub const REPORT_COLUMNS: [&str; 6] = ["timestamp", "antivirus", "threat", "path", "size", "md5"];

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    timestamp: String,
    antivirus: &'a str,
    threat: &'a str,
    path: &'a str,
    size: u64,
    md5: &'a str,
}

impl<'a> ReportRow<'a> {
    fn new(antivirus: &'a str, entry: &'a Entry) -> Self {
        Self {
            timestamp: entry
                .timestamp()
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            antivirus,
            threat: entry.threat(),
            path: entry.path(),
            size: entry.size(),
            md5: entry.md5(),
        }
    }
}

/// Writes one CSV row per entry, CRLF-terminated, under a fixed header.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `path` holds the vendor-recorded location and `size` the
    /// vendor-recorded size, even when it disagrees with the payload.
    pub fn write(&self, stores: &[CollectedStore]) -> Result<ExportSummary> {
        let mut summary = ExportSummary::new(OutputKind::Report);
        if stores.iter().all(|s| s.entries.is_empty()) {
            return Ok(summary);
        }

        let fail = |e: csv::Error| MalDumpError::output_write(&self.path, e.into());

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(staging::open(&self.path)?);

        for store in stores {
            for entry in &store.entries {
                writer.serialize(ReportRow::new(&store.name, entry)).map_err(fail)?;
                summary.record(entry);
            }
        }

        let staged = writer
            .into_inner()
            .map_err(|e| MalDumpError::output_write(&self.path, e.into_error()))?;
        staging::commit(staged, &self.path)?;

        tracing::debug!(path = %self.path.display(), rows = summary.objects, "report written");
        summary.path = Some(self.path.clone());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn report(dir: &TempDir) -> PathBuf {
        dir.path().join("quarantine.csv")
    }

    #[test]
    fn test_header_and_row() {
        let dir = TempDir::new().unwrap();
        let path = report(&dir);
        let entry = Entry::builder(r"C:\m.exe", b"12345".to_vec())
            .timestamp(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap())
            .threat("Trojan")
            .md5("abc")
            .build();
        let stores = vec![CollectedStore::new("vendorA", vec![entry])];

        let summary = ReportWriter::new(&path).write(&stores).unwrap();
        assert_eq!(summary.objects, 1);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "timestamp,antivirus,threat,path,size,md5\r\n\
             2023-01-02 03:04:05,vendorA,Trojan,C:\\m.exe,5,abc\r\n"
        );
    }

    #[test]
    fn test_header_matches_columns() {
        let dir = TempDir::new().unwrap();
        let path = report(&dir);
        let stores = vec![CollectedStore::new("v", vec![Entry::new("x", vec![1])])];
        ReportWriter::new(&path).write(&stores).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(header, REPORT_COLUMNS.join(","));
    }

    #[test]
    fn test_missing_timestamp_renders_empty() {
        let dir = TempDir::new().unwrap();
        let path = report(&dir);
        let stores = vec![CollectedStore::new("v", vec![Entry::new("/tmp/a", vec![1, 2])])];
        ReportWriter::new(&path).write(&stores).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().nth(1), Some(",v,,/tmp/a,2,"));
    }

    #[test]
    fn test_rows_keep_vendor_size() {
        let dir = TempDir::new().unwrap();
        let path = report(&dir);
        let entry = Entry::builder("C:\\m.exe", b"12345".to_vec()).size(99).build();
        let stores = vec![CollectedStore::new("v", vec![entry])];

        let summary = ReportWriter::new(&path).write(&stores).unwrap();
        assert_eq!(summary.inconsistent_entries, 1);
        assert_eq!(summary.bytes, 5);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.lines().nth(1).unwrap().contains(",99,"));
    }

    #[test]
    fn test_fields_with_delimiters_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = report(&dir);
        let entry = Entry::builder("C:\\a,b.exe", vec![1])
            .threat("Trojan:Win32/Foo")
            .build();
        let stores = vec![CollectedStore::new("v", vec![entry])];
        ReportWriter::new(&path).write(&stores).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[3], "C:\\a,b.exe");
        assert_eq!(&record[2], "Trojan:Win32/Foo");
    }

    #[test]
    fn test_no_entries_no_report() {
        let dir = TempDir::new().unwrap();
        let path = report(&dir);
        let summary = ReportWriter::new(&path)
            .write(&[CollectedStore::new("v", Vec::new())])
            .unwrap();
        assert_eq!(summary.objects, 0);
        assert!(!path.exists());
    }
}
