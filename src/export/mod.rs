pub mod archive;
pub mod listing;
pub mod path_normalizer;
pub mod pipeline;
pub mod report;
mod staging;

pub use archive::ArchiveWriter;
pub use listing::write_listing;
pub use path_normalizer::{
    archive_member_name, is_safe_delimiter, normalize_path, MemberNamer, DEFAULT_DELIMITER,
};
pub use pipeline::{
    Checkpoint, CollectedStore, Collection, ExportOutcome, ExportPipeline, ExportSummary,
    OutputKind, OutputSelection, DEFAULT_ARCHIVE_NAME, DEFAULT_REPORT_NAME,
};
pub use report::{ReportWriter, REPORT_COLUMNS, TIMESTAMP_FORMAT};
