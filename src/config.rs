use crate::error::{MalDumpError, Result};
use crate::export::{is_safe_delimiter, DEFAULT_ARCHIVE_NAME, DEFAULT_DELIMITER, DEFAULT_REPORT_NAME};
use crate::quarantine::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_VENDOR: &str = "malwarebytes";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where outputs are written. Relative paths are resolved against the
    /// working directory at startup; unset means the working directory.
    pub base_directory: Option<PathBuf>,
    pub archive_name: String,
    pub report_name: String,
    /// Joins the components of drive-letter paths in archive member names.
    pub delimiter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Vendor opened by name when not running in partition mode.
    pub default_vendor: String,
    /// Restricts partition-mode detection to these vendor keys.
    pub vendors: Option<Vec<String>>,
    pub max_depth: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_directory: None,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            report_name: DEFAULT_REPORT_NAME.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            default_vendor: DEFAULT_VENDOR.to_string(),
            vendors: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MalDumpError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MalDumpError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| MalDumpError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["maldump.toml", ".maldump.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        tracing::debug!(path = default_path, "loading configuration");
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.base_directory = Some(output_dir.clone());
        }

        if let Some(ref name) = cli_args.archive_name {
            self.output.archive_name = name.clone();
        }

        if let Some(ref name) = cli_args.report_name {
            self.output.report_name = name.clone();
        }

        if let Some(ref delimiter) = cli_args.delimiter {
            self.output.delimiter = delimiter.clone();
        }

        if let Some(ref vendor) = cli_args.vendor {
            self.detection.default_vendor = vendor.to_lowercase();
        }

        if let Some(ref vendors) = cli_args.vendors {
            self.detection.vendors = Some(
                vendors
                    .iter()
                    .map(|v| v.trim().to_lowercase())
                    .filter(|v| !v.is_empty())
                    .collect(),
            );
        }

        if let Some(max_depth) = cli_args.max_depth {
            self.detection.max_depth = max_depth;
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_file_name("archive_name", &self.output.archive_name)?;
        validate_file_name("report_name", &self.output.report_name)?;

        if self.output.archive_name == self.output.report_name {
            return Err(MalDumpError::Config {
                message: "archive_name and report_name must differ".to_string(),
            });
        }

        if self.output.delimiter.is_empty() {
            return Err(MalDumpError::Config {
                message: "Path delimiter must not be empty".to_string(),
            });
        }

        if !is_safe_delimiter(&self.output.delimiter) {
            return Err(MalDumpError::Config {
                message: format!(
                    "Path delimiter {:?} would be rewritten in archive member names",
                    self.output.delimiter
                ),
            });
        }

        if self.detection.default_vendor.trim().is_empty() {
            return Err(MalDumpError::Config {
                message: "A default vendor must be specified".to_string(),
            });
        }

        if self.detection.max_depth == 0 {
            return Err(MalDumpError::Config {
                message: "Maximum store depth must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

fn validate_file_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MalDumpError::Config {
            message: format!("{} must not be empty", field),
        });
    }

    if name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
        return Err(MalDumpError::Config {
            message: format!("{} must be a plain file name: {}", field, name),
        });
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub archive_name: Option<String>,
    pub report_name: Option<String>,
    pub delimiter: Option<String>,
    pub vendor: Option<String>,
    pub vendors: Option<Vec<String>>,
    pub max_depth: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_archive_name(mut self, name: Option<String>) -> Self {
        self.archive_name = name;
        self
    }

    pub fn with_report_name(mut self, name: Option<String>) -> Self {
        self.report_name = name;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Option<String>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_vendor(mut self, vendor: Option<String>) -> Self {
        self.vendor = vendor;
        self
    }

    pub fn with_vendors(mut self, vendors: Option<Vec<String>>) -> Self {
        self.vendors = vendors;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.archive_name, "quarantine.tar");
        assert_eq!(config.output.report_name, "quarantine.csv");
        assert_eq!(config.output.delimiter, "/");
        assert_eq!(config.detection.default_vendor, "malwarebytes");
        assert!(config.output.base_directory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.output.archive_name = "../escape.tar".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.report_name = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.delimiter = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.delimiter = "\0".to_string();
        assert!(config.validate().is_err());

        for delimiter in ["|", "\\", "::", "./"] {
            let mut config = Config::default();
            config.output.delimiter = delimiter.to_string();
            assert!(matches!(
                config.validate(),
                Err(MalDumpError::Config { .. })
            ));
        }

        let mut config = Config::default();
        config.output.delimiter = "_".to_string();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.detection.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.report_name = config.output.archive_name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.output.delimiter = "_".to_string();
        config.detection.vendors = Some(vec!["defender".to_string()]);
        let temp_file = NamedTempFile::new().unwrap();

        std::fs::write(temp_file.path(), toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.output.delimiter, "_");
        assert_eq!(loaded.detection.vendors, Some(vec!["defender".to_string()]));
    }

    #[test]
    fn test_partial_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[output]\narchive_name = \"samples.tar\"").unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.archive_name, "samples.tar");
        assert_eq!(config.output.report_name, "quarantine.csv");
        assert_eq!(config.detection.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_invalid_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[output\narchive_name = 1").unwrap();

        assert!(matches!(
            Config::load_from_file(temp_file.path()),
            Err(MalDumpError::Config { .. })
        ));
        assert!(Config::load_from_file("/nonexistent/maldump.toml").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_output_dir(Some(PathBuf::from("/tmp/out")))
            .with_delimiter(Some("_".to_string()))
            .with_vendor(Some("Defender".to_string()))
            .with_vendors(Some(vec![" Avast ".to_string(), "".to_string()]));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.output.base_directory, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.output.delimiter, "_");
        assert_eq!(config.detection.default_vendor, "defender");
        assert_eq!(config.detection.vendors, Some(vec!["avast".to_string()]));
        assert_eq!(config.output.archive_name, "quarantine.tar");
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[output]"));
        assert!(sample.contains("[detection]"));
        assert!(sample.contains("quarantine.tar"));
    }
}
