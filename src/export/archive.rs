use crate::error::{MalDumpError, Result};
use crate::export::path_normalizer::MemberNamer;
use crate::export::pipeline::{CollectedStore, ExportSummary, OutputKind};
use crate::export::staging;

use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};

/// Writes every collected entry into one uncompressed tar archive.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    path: PathBuf,
    delimiter: String,
}

impl ArchiveWriter {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, delimiter: S) -> Self {
        Self {
            path: path.into(),
            delimiter: delimiter.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Members are appended in store order, then entry order. Nothing is
    /// created when there are no entries.
    ///
    /// The archive is assembled in a temporary file next to the destination
    /// and renamed into place once complete.
    pub fn write(&self, stores: &[CollectedStore]) -> Result<ExportSummary> {
        let mut summary = ExportSummary::new(OutputKind::Archive);
        if stores.iter().all(|s| s.entries.is_empty()) {
            return Ok(summary);
        }

        let fail = |e: std::io::Error| MalDumpError::output_write(&self.path, e);

        let mut builder = Builder::new(staging::open(&self.path)?);
        let mut namer = MemberNamer::new(self.delimiter.as_str());

        for store in stores {
            for (index, entry) in store.entries.iter().enumerate() {
                let member = namer.member_name(&store.name, entry.path(), index);

                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Regular);
                header.set_size(entry.payload_len());
                header.set_mode(0o644);
                header.set_mtime(
                    entry
                        .timestamp()
                        .map(|ts| ts.timestamp().max(0) as u64)
                        .unwrap_or(0),
                );

                builder
                    .append_data(&mut header, &member, entry.malfile())
                    .map_err(fail)?;

                summary.record(entry);
            }
        }

        let staged = builder.into_inner().map_err(fail)?;
        staging::commit(staged, &self.path)?;

        tracing::debug!(path = %self.path.display(), objects = summary.objects, "archive written");
        summary.path = Some(self.path.clone());
        Ok(summary)
    }
}
