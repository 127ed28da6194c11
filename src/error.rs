use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MalDumpError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown antivirus vendor: {key}")]
    UnknownVendor { key: String },

    #[error("No {vendor} quarantine found under {}", root.display())]
    StoreNotFound { vendor: String, root: PathBuf },

    #[error("{vendor} quarantine is corrupt: {reason}")]
    StoreCorrupt { vendor: String, reason: String },

    #[error("Unreadable {vendor} quarantine record {record}: {reason}")]
    RecordCorrupt {
        vendor: String,
        record: String,
        reason: String,
    },

    #[error("Failed to write {}", path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("{} export output(s) failed", failures.len())]
    ExportFailed { failures: Vec<MalDumpError> },
}

impl MalDumpError {
    pub fn output_write<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        MalDumpError::OutputWriteFailure {
            path: path.into(),
            source,
        }
    }

    pub fn store_corrupt<V: Into<String>, R: Into<String>>(vendor: V, reason: R) -> Self {
        MalDumpError::StoreCorrupt {
            vendor: vendor.into(),
            reason: reason.into(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for MalDumpError {
    fn user_message(&self) -> String {
        match self {
            MalDumpError::UnknownVendor { key } => {
                format!("Unknown antivirus vendor: {}", key)
            }
            MalDumpError::StoreNotFound { vendor, root } => {
                format!("No {} quarantine found under {}", vendor, root.display())
            }
            MalDumpError::StoreCorrupt { vendor, reason } => {
                format!("The {} quarantine could not be read: {}", vendor, reason)
            }
            MalDumpError::RecordCorrupt {
                vendor,
                record,
                reason,
            } => {
                format!("Skipped unreadable {} record {}: {}", vendor, record, reason)
            }
            MalDumpError::OutputWriteFailure { path, source } => {
                format!("Could not write {}: {}", path.display(), source)
            }
            MalDumpError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            MalDumpError::InvalidPath { path } => {
                format!("Invalid path: {}", path)
            }
            MalDumpError::Cancelled => "Operation was cancelled by user".to_string(),
            MalDumpError::ExportFailed { failures } => {
                let details: Vec<String> = failures.iter().map(|e| e.user_message()).collect();
                format!("Export failed: {}", details.join("; "))
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            MalDumpError::UnknownVendor { .. } => Some(
                "Run with --list-vendors to see the supported quarantines.".to_string()
            ),
            MalDumpError::StoreNotFound { .. } => Some(
                "Check that the root directory is the partition where the OS is installed (e.g. C:\\ or a mounted image), or use --partition to detect every installed antivirus.".to_string()
            ),
            MalDumpError::StoreCorrupt { .. } => Some(
                "The quarantine may be damaged or still locked by the antivirus service. Try again from an offline copy of the partition.".to_string()
            ),
            MalDumpError::OutputWriteFailure { .. } => Some(
                "Ensure you have write permission and enough free space in the output directory, or choose another one with --output-dir.".to_string()
            ),
            MalDumpError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            MalDumpError::ExportFailed { .. } => Some(
                "Outputs that are not listed as failed were still written.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for MalDumpError {
    fn from(error: toml::de::Error) -> Self {
        MalDumpError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MalDumpError>;
