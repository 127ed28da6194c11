use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::quarantine::Registry;
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "maldump")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-quarantine extractor")]
#[command(
    long_about = "Multi-quarantine extractor. Recovers quarantined files and their metadata \
                  from antivirus quarantine stores. Runs in Malwarebytes relative extraction \
                  mode unless --partition is given."
)]
#[command(after_help = supported_quarantines())]
#[command(group(ArgGroup::new("action").args(["list", "quar", "meta", "all", "search"])))]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Root directory where the OS is installed (e.g. C:\ or a mounted image)
    #[arg(required_unless_present_any = ["list_vendors", "generate_config"])]
    pub root_dir: Option<PathBuf>,

    /// List quarantined file(s) to stdout (default action)
    #[arg(short, long)]
    pub list: bool,

    /// Dump quarantined file(s) to the archive ('quarantine.tar')
    #[arg(short, long)]
    pub quar: bool,

    /// Dump metadata to the CSV report ('quarantine.csv')
    #[arg(short, long)]
    pub meta: bool,

    /// Equivalent of running both -q and -m
    #[arg(short, long)]
    pub all: bool,

    /// List the antivirus quarantines found under the root directory
    #[arg(short, long)]
    pub search: bool,

    /// Partition mode: detect every installed antivirus instead of the default vendor
    #[arg(short, long)]
    pub partition: bool,

    /// Delimiter joining Windows path components in archive member names
    #[arg(short, long)]
    pub delim: Option<String>,

    /// Vendor opened when not running in partition mode
    #[arg(long, value_name = "KEY")]
    pub vendor: Option<String>,

    /// Restrict partition-mode detection to these vendors (comma-separated)
    #[arg(long, value_name = "KEYS", value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Directory receiving the archive and report (defaults to the working directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// File name of the archive
    #[arg(long)]
    pub archive_name: Option<String>,

    /// File name of the CSV report
    #[arg(long)]
    pub report_name: Option<String>,

    /// Maximum directory depth walked inside a quarantine store
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print the supported quarantines and exit
    #[arg(long)]
    pub list_vendors: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Archive,
    Metadata,
    All,
    Search,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_output_dir(self.output_dir.clone())
            .with_archive_name(self.archive_name.clone())
            .with_report_name(self.report_name.clone())
            .with_delimiter(self.delim.clone())
            .with_vendor(self.vendor.clone())
            .with_vendors(self.only.clone())
            .with_max_depth(self.max_depth)
    }

    pub fn action(&self) -> Action {
        if self.quar {
            Action::Archive
        } else if self.meta {
            Action::Metadata
        } else if self.all {
            Action::All
        } else if self.search {
            Action::Search
        } else {
            Action::List
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Help epilog naming every built-in quarantine, sorted by name.
pub fn supported_quarantines() -> String {
    let registry = Registry::builtin();
    let mut names: Vec<&str> = registry.vendors().map(|(_, name)| name).collect();
    names.sort_unstable();

    let lines: Vec<String> = names.iter().map(|name| format!("  * {}", name)).collect();
    format!("Supported quarantines:\n{}", lines.join("\n"))
}
