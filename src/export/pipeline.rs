//! Collects every adapter once and fans the cached entries into the listing,
//! archive and metadata outputs.

use crate::config::OutputConfig;
use crate::error::{MalDumpError, Result};
use crate::export::archive::ArchiveWriter;
use crate::export::listing;
use crate::export::path_normalizer::DEFAULT_DELIMITER;
use crate::export::report::ReportWriter;
use crate::quarantine::{AdapterFailure, Entry, QuarantineAdapter};

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_ARCHIVE_NAME: &str = "quarantine.tar";
pub const DEFAULT_REPORT_NAME: &str = "quarantine.csv";

/// Called with a vendor name before each adapter is exported and with the
/// output name before each output is written. Returning an error stops the
/// run.
pub type Checkpoint<'a> = &'a (dyn Fn(&str) -> Result<()> + Sync);

/// Entries exported by one adapter during a run.
#[derive(Debug, Clone)]
pub struct CollectedStore {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl CollectedStore {
    pub fn new<S: Into<String>>(name: S, entries: Vec<Entry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

#[derive(Debug, Default)]
pub struct Collection {
    /// One store per adapter that exported successfully, in adapter order.
    pub stores: Vec<CollectedStore>,
    pub failures: Vec<AdapterFailure>,
}

impl Collection {
    pub fn total_entries(&self) -> usize {
        self.stores.iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Archive,
    Report,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Archive => "archive",
            OutputKind::Report => "report",
        }
    }
}

/// What one output mode produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub kind: OutputKind,
    pub objects: usize,
    /// Total payload bytes.
    pub bytes: u64,
    pub inconsistent_entries: usize,
    /// `None` when nothing was written.
    pub path: Option<PathBuf>,
}

impl ExportSummary {
    pub fn new(kind: OutputKind) -> Self {
        Self {
            kind,
            objects: 0,
            bytes: 0,
            inconsistent_entries: 0,
            path: None,
        }
    }

    pub fn record(&mut self, entry: &Entry) {
        self.objects += 1;
        self.bytes += entry.payload_len();
        if !entry.is_consistent() {
            self.inconsistent_entries += 1;
        }
    }

    pub fn is_written(&self) -> bool {
        self.path.is_some()
    }

    /// Operator message, `None` when nothing was written.
    pub fn message(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Some(match self.kind {
            OutputKind::Archive => format!("Exported {} object(s) into '{}'", self.objects, file),
            OutputKind::Report => format!("Written {} row(s) into file '{}'", self.objects, file),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputSelection {
    pub archive: bool,
    pub report: bool,
}

impl OutputSelection {
    pub fn archive() -> Self {
        Self {
            archive: true,
            report: false,
        }
    }

    pub fn report() -> Self {
        Self {
            archive: false,
            report: true,
        }
    }

    pub fn both() -> Self {
        Self {
            archive: true,
            report: true,
        }
    }
}

/// Outcome of writing the selected outputs. Each output fails on its own.
#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub summaries: Vec<ExportSummary>,
    pub errors: Vec<MalDumpError>,
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self, kind: OutputKind) -> Option<&ExportSummary> {
        self.summaries.iter().find(|s| s.kind == kind)
    }

    /// A single failure is returned as is, several are wrapped in
    /// [`MalDumpError::ExportFailed`].
    pub fn into_result(mut self) -> Result<Vec<ExportSummary>> {
        match self.errors.len() {
            0 => Ok(self.summaries),
            1 => Err(self.errors.remove(0)),
            _ => Err(MalDumpError::ExportFailed {
                failures: self.errors,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportPipeline {
    base_dir: PathBuf,
    archive_name: String,
    report_name: String,
    delimiter: String,
}

impl ExportPipeline {
    /// Outputs are written into `base_dir`.
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            report_name: DEFAULT_REPORT_NAME.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// A relative `base_directory` is resolved against `cwd`.
    pub fn from_config(config: &OutputConfig, cwd: &Path) -> Self {
        let base_dir = match config.base_directory {
            Some(ref dir) if dir.is_absolute() => dir.clone(),
            Some(ref dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };

        Self::new(base_dir)
            .with_archive_name(config.archive_name.as_str())
            .with_report_name(config.report_name.as_str())
            .with_delimiter(config.delimiter.as_str())
    }

    pub fn with_archive_name<S: Into<String>>(mut self, name: S) -> Self {
        self.archive_name = name.into();
        self
    }

    pub fn with_report_name<S: Into<String>>(mut self, name: S) -> Self {
        self.report_name = name.into();
        self
    }

    pub fn with_delimiter<S: Into<String>>(mut self, delimiter: S) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn archive_path(&self) -> PathBuf {
        self.base_dir.join(&self.archive_name)
    }

    pub fn report_path(&self) -> PathBuf {
        self.base_dir.join(&self.report_name)
    }

    /// Runs `export()` exactly once per adapter.
    ///
    /// A failing adapter is recorded in [`Collection::failures`] and does not
    /// stop the others. Only a checkpoint error aborts collection.
    pub fn collect(
        &self,
        adapters: &[Box<dyn QuarantineAdapter>],
        checkpoint: Option<Checkpoint<'_>>,
    ) -> Result<Collection> {
        let mut collection = Collection::default();

        for (name, result) in export_all(adapters, checkpoint)? {
            match result {
                Ok(entries) => {
                    for entry in entries.iter().filter(|e| !e.is_consistent()) {
                        tracing::warn!(
                            vendor = %name,
                            path = entry.path(),
                            recorded = entry.size(),
                            actual = entry.payload_len(),
                            "recorded size differs from payload"
                        );
                    }
                    tracing::debug!(vendor = %name, count = entries.len(), "collected quarantine entries");
                    collection.stores.push(CollectedStore::new(name, entries));
                }
                Err(error) => {
                    tracing::warn!(vendor = %name, %error, "quarantine export failed");
                    collection.failures.push(AdapterFailure {
                        vendor: name,
                        error,
                    });
                }
            }
        }

        Ok(collection)
    }

    /// Writes the vendor listing to `out`. Returns the number of paths listed.
    pub fn list<W: Write>(&self, collection: &Collection, out: &mut W, colored: bool) -> Result<usize> {
        Ok(listing::write_listing(out, &collection.stores, colored)?)
    }

    /// Writes the selected outputs from one collection.
    ///
    /// Every selected output is attempted; a failure of one is reported next
    /// to the success of the other. With zero entries no file is created.
    pub fn export(
        &self,
        collection: &Collection,
        selection: OutputSelection,
        checkpoint: Option<Checkpoint<'_>>,
    ) -> ExportOutcome {
        let mut outcome = ExportOutcome::default();

        if selection.archive {
            let writer = ArchiveWriter::new(self.archive_path(), self.delimiter.as_str());
            let result = pass(checkpoint, OutputKind::Archive)
                .and_then(|_| writer.write(&collection.stores));
            record(&mut outcome, result);
        }

        if selection.report {
            let writer = ReportWriter::new(self.report_path());
            let result = pass(checkpoint, OutputKind::Report)
                .and_then(|_| writer.write(&collection.stores));
            record(&mut outcome, result);
        }

        outcome
    }
}

fn pass(checkpoint: Option<Checkpoint<'_>>, kind: OutputKind) -> Result<()> {
    match checkpoint {
        Some(check) => check(kind.as_str()),
        None => Ok(()),
    }
}

fn record(outcome: &mut ExportOutcome, result: Result<ExportSummary>) {
    match result {
        Ok(summary) => outcome.summaries.push(summary),
        Err(error) => {
            tracing::warn!(%error, "export output failed");
            outcome.errors.push(error);
        }
    }
}

type Exported = (String, Result<Vec<Entry>>);

fn export_one(adapter: &dyn QuarantineAdapter, checkpoint: Option<Checkpoint<'_>>) -> Result<Exported> {
    if let Some(check) = checkpoint {
        check(adapter.name())?;
    }
    Ok((adapter.name().to_string(), adapter.export()))
}

#[cfg(feature = "parallel")]
fn export_all(adapters: &[Box<dyn QuarantineAdapter>], checkpoint: Option<Checkpoint<'_>>) -> Result<Vec<Exported>> {
    use rayon::prelude::*;

    adapters
        .par_iter()
        .map(|adapter| export_one(adapter.as_ref(), checkpoint))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn export_all(adapters: &[Box<dyn QuarantineAdapter>], checkpoint: Option<Checkpoint<'_>>) -> Result<Vec<Exported>> {
    adapters
        .iter()
        .map(|adapter| export_one(adapter.as_ref(), checkpoint))
        .collect()
}
