use clap::Parser;
use maldump::{Cli, MalDump, MalDumpError, OutputFormatter, OutputMode, Registry, UserFriendlyError};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level());

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    if cli.list_vendors {
        return handle_list_vendors(&cli);
    }

    let root = match cli.root_dir {
        Some(ref root) => root.clone(),
        None => {
            print_startup_error(&MalDumpError::InvalidPath {
                path: "<missing root directory>".to_string(),
            });
            return 1;
        }
    };

    let maldump = match MalDump::from_cli(&cli) {
        Ok(maldump) => maldump,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    tracing::debug!(root = %root.display(), action = ?cli.action(), partition = cli.partition, "starting");

    match maldump.run(&root, cli.action(), cli.partition) {
        Ok(report) => {
            if report.is_partial() {
                2 // Some vendors were skipped
            } else {
                0
            }
        }
        Err(e) => {
            maldump.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &MalDumpError) -> i32 {
    match error {
        MalDumpError::Cancelled => 130, // Interrupted (SIGINT)
        MalDumpError::StoreNotFound { .. } => 3,
        MalDumpError::StoreCorrupt { .. } | MalDumpError::RecordCorrupt { .. } => 3,
        MalDumpError::UnknownVendor { .. } => 4,
        MalDumpError::OutputWriteFailure { .. } | MalDumpError::ExportFailed { .. } => 5,
        MalDumpError::Config { .. } => 6,
        _ => 1, // General error
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "maldump.toml".to_string());

    match MalDump::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  maldump <root-dir> --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_list_vendors(cli: &Cli) -> i32 {
    let depth = match cli.load_config() {
        Ok(config) => config.detection.max_depth,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let formatter = OutputFormatter::new(output_mode(cli), cli.verbose, cli.quiet);
    formatter.print_vendors(Registry::builtin_with_depth(depth).vendors());
    0
}

fn output_mode(cli: &Cli) -> OutputMode {
    match cli.output_format {
        maldump::OutputFormat::Human => OutputMode::Human,
        maldump::OutputFormat::Json => OutputMode::Json,
        maldump::OutputFormat::Plain => OutputMode::Plain,
    }
}

fn print_startup_error(error: &MalDumpError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

/// `RUST_LOG` wins; otherwise warnings, raised by each `-v`.
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("maldump={}", level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use maldump::Config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli::parse_from([
            "maldump",
            "--generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ]);

        let exit_code = handle_generate_config(&cli);
        assert_eq!(exit_code, 0);

        let content = fs::read_to_string(&config_path).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.output.archive_name, "quarantine.tar");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&MalDumpError::Cancelled), 130);
        assert_eq!(
            exit_code_for(&MalDumpError::UnknownVendor {
                key: "norton".to_string()
            }),
            4
        );
        assert_eq!(
            exit_code_for(&MalDumpError::ExportFailed { failures: Vec::new() }),
            5
        );
        assert_eq!(
            exit_code_for(&MalDumpError::Config {
                message: String::new()
            }),
            6
        );
    }
}
