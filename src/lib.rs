pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod quarantine;
pub mod ui;

#[cfg(test)]
mod testing;

// Public API re-exports
pub use cli::{Action, Cli, OutputFormat};
pub use config::{CliOverrides, Config, DetectionConfig, OutputConfig};
pub use error::{MalDumpError, Result, UserFriendlyError};

// Core functionality re-exports
pub use export::{
    normalize_path, CollectedStore, Collection, ExportOutcome, ExportPipeline, ExportSummary,
    OutputKind, OutputSelection,
};
pub use quarantine::{
    AdapterFactory, AdapterFailure, Detection, Entry, EntryBuilder, QuarantineAdapter, Registry,
    StoreStatus,
};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What a run did, for the exit status and JSON output.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Vendors whose quarantine was read.
    pub vendors: Vec<String>,
    /// Paths printed by the listing action.
    pub listed: usize,
    pub summaries: Vec<ExportSummary>,
    /// Vendors skipped because their store could not be read.
    pub failed_vendors: Vec<String>,
}

impl RunReport {
    /// Some vendor was skipped but the run itself succeeded.
    pub fn is_partial(&self) -> bool {
        !self.failed_vendors.is_empty()
    }

    fn record_failures(&mut self, failures: &[AdapterFailure]) {
        self.failed_vendors
            .extend(failures.iter().map(|f| f.vendor.clone()));
    }
}

/// Main library interface for maldump functionality
pub struct MalDump {
    config: Config,
    registry: Registry,
    base_dir: PathBuf,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl MalDump {
    /// Outputs are resolved against the working directory at the time of
    /// this call; the working directory is never changed afterwards.
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let base_dir = std::env::current_dir()?;
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;
        let registry = Registry::builtin_with_depth(config.detection.max_depth);

        Ok(Self {
            config,
            registry,
            base_dir,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// No signal handler, no progress bars, quiet output.
    #[cfg(test)]
    pub fn new_for_test(config: Config, base_dir: &Path) -> Self {
        Self {
            registry: Registry::builtin_with_depth(config.detection.max_depth),
            config,
            base_dir: base_dir.to_path_buf(),
            output_formatter: OutputFormatter::new(OutputMode::Plain, 0, true),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Replaces the built-in vendor catalog.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn pipeline(&self) -> ExportPipeline {
        ExportPipeline::from_config(&self.config.output, &self.base_dir)
    }

    /// Probes `root` for every vendor, or only the configured ones.
    pub fn detect(&self, root: &Path) -> Result<Detection> {
        self.shutdown.check_shutdown()?;

        let detection = match self.config.detection.vendors {
            Some(ref keys) => self.registry.restrict(keys)?.detect(root),
            None => self.registry.detect(root),
        };

        self.output_formatter.debug(&format!(
            "Detected {} quarantine(s) under {}",
            detection.adapters.len(),
            root.display()
        ));
        Ok(detection)
    }

    /// Adapters to read: every detected store in partition mode, otherwise
    /// only the default vendor, which must be present.
    pub fn open_adapters(&self, root: &Path, partition: bool) -> Result<Detection> {
        if partition {
            return self.detect(root);
        }

        let vendor = &self.config.detection.default_vendor;
        let adapter = self.registry.named_init(vendor, root)?;
        Ok(Detection {
            adapters: vec![adapter],
            failures: Vec::new(),
        })
    }

    pub fn run(&self, root: &Path, action: Action, partition: bool) -> Result<RunReport> {
        let mut report = RunReport::default();

        if action == Action::Search {
            let detection = self.detect(root)?;
            self.output_formatter.print_adapter_failures(&detection.failures);
            report.record_failures(&detection.failures);

            let names = detection.vendor_names();
            self.output_formatter.print_detected(&names);
            report.vendors = names.into_iter().map(String::from).collect();
            return Ok(report);
        }

        self.output_formatter
            .start_operation(&format!("Reading quarantine under {}", root.display()));

        let detection = self.open_adapters(root, partition)?;
        self.output_formatter.print_adapter_failures(&detection.failures);
        report.record_failures(&detection.failures);

        let collection = self.collect(&detection.adapters)?;
        self.output_formatter.print_adapter_failures(&collection.failures);
        report.record_failures(&collection.failures);
        report.vendors = collection.stores.iter().map(|s| s.name.clone()).collect();

        let selection = match action {
            Action::List => {
                report.listed = self
                    .progress_manager
                    .suspend(|| self.output_formatter.print_listing(&collection.stores))?;
                return Ok(report);
            }
            Action::Archive => OutputSelection::archive(),
            Action::Metadata => OutputSelection::report(),
            Action::All | Action::Search => OutputSelection::both(),
        };

        if collection.is_empty() {
            self.output_formatter.info("No quarantined entries found, nothing written");
        }

        let shutdown = &self.shutdown;
        let checkpoint = move |_: &str| shutdown.check_shutdown();
        let outcome = self.pipeline().export(&collection, selection, Some(&checkpoint));

        for summary in &outcome.summaries {
            self.output_formatter.print_export_summary(summary);
        }

        report.summaries = outcome.into_result()?;
        Ok(report)
    }

    /// Reads every adapter once, checking for Ctrl-C between stores.
    fn collect(&self, adapters: &[Box<dyn QuarantineAdapter>]) -> Result<Collection> {
        let pb = self.progress_manager.create_store_progress(adapters.len() as u64);
        let started = Instant::now();
        let shutdown = &self.shutdown;

        let checkpoint = |vendor: &str| -> Result<()> {
            shutdown.check_shutdown()?;
            ui::progress::update_store_progress(&pb, vendor);
            pb.inc(1);
            Ok(())
        };

        let result = self.pipeline().collect(adapters, Some(&checkpoint));

        let message = match result {
            Ok(ref collection) => format!("Read {} quarantined entries", collection.total_entries()),
            Err(_) => "Reading quarantine stopped".to_string(),
        };
        ui::progress::finish_progress_with_summary(&pb, &message, started.elapsed());

        result
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn handle_error(&self, error: &MalDumpError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
        parallel: cfg!(feature = "parallel"),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
    pub parallel: bool,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "maldump {} ({}) built on {} for {}{}",
            self.version,
            self.git_hash,
            self.build_date,
            self.target,
            if self.parallel { " [parallel]" } else { "" }
        )
    }
}
