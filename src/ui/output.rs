use crate::error::{MalDumpError, UserFriendlyError};
use crate::export::{write_listing, CollectedStore, ExportSummary};
use crate::quarantine::AdapterFailure;
use console::{style, Emoji, Term};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static SEARCH: Emoji = Emoji("🔍 ", "> ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("{}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    /// Warnings go to stderr so they never mix with listings on stdout.
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => eprintln!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!("  {}", style(message).dim());
                    } else {
                        eprintln!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => eprintln!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!("{}{}", SEARCH, style(operation).bold());
                    } else {
                        eprintln!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => eprintln!("STARTING: {}", operation),
            }
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &MalDumpError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    pub fn print_adapter_failures(&self, failures: &[AdapterFailure]) {
        for failure in failures {
            self.warning(&format!("Skipped {}: {}", failure.vendor, failure.error.user_message()));
        }
    }

    /// Prints the per-vendor listing. Printed even in quiet mode.
    pub fn print_listing(&self, stores: &[CollectedStore]) -> io::Result<usize> {
        match self.mode {
            OutputMode::Json => {
                let mut listed = 0;
                for store in stores.iter().filter(|s| !s.entries.is_empty()) {
                    let paths: Vec<&str> = store.entries.iter().map(|e| e.path()).collect();
                    listed += paths.len();
                    self.print_json_object(&serde_json::json!({
                        "type": "listing",
                        "antivirus": store.name,
                        "paths": paths
                    }));
                }
                Ok(listed)
            }
            _ => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                write_listing(&mut out, stores, self.use_colors)
            }
        }
    }

    pub fn print_vendors<'a, I>(&self, vendors: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let vendors: Vec<(&str, &str)> = vendors.into_iter().collect();

        match self.mode {
            OutputMode::Json => {
                let list: Vec<_> = vendors
                    .iter()
                    .map(|(key, name)| serde_json::json!({ "key": key, "name": name }))
                    .collect();
                self.print_json_object(&serde_json::json!({
                    "type": "vendors",
                    "vendors": list
                }));
            }
            OutputMode::Human if self.use_colors => {
                for (key, name) in vendors {
                    println!("{:<14} {}", style(key).yellow(), name);
                }
            }
            _ => {
                for (key, name) in vendors {
                    println!("{:<14} {}", key, name);
                }
            }
        }
    }

    pub fn print_detected(&self, names: &[&str]) {
        match self.mode {
            OutputMode::Json => self.print_json_object(&serde_json::json!({
                "type": "detected",
                "antivirus": names
            })),
            _ => {
                for name in names {
                    println!("{}", name);
                }
            }
        }
    }

    pub fn print_export_summary(&self, summary: &ExportSummary) {
        match self.mode {
            OutputMode::Json => {
                let mut value = serde_json::to_value(summary).unwrap_or_else(|_| serde_json::json!({}));
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("type".to_string(), serde_json::json!("summary"));
                }
                self.print_json_object(&value);
            }
            _ => {
                if let Some(message) = summary.message() {
                    self.success(&message);
                    if summary.bytes > 0 {
                        self.info(&format!("{} of payload written", format_bytes(summary.bytes)));
                    }
                }
                if summary.inconsistent_entries > 0 {
                    self.warning(&format!(
                        "{} entry(ies) recorded a size different from the recovered payload",
                        summary.inconsistent_entries
                    ));
                }
            }
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Success => println!("{}{}", emoji, color_fn(message)),
                _ => eprintln!("{}{}", emoji, color_fn(message)),
            }
        } else {
            match msg_type {
                MessageType::Success => println!("{}", message),
                MessageType::Error => eprintln!("✗ {}", message),
                MessageType::Warning => eprintln!("! {}", message),
                MessageType::Info => eprintln!("i {}", message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(!formatter.use_colors);
        assert!(!formatter.should_show_message(0));
    }

    #[test]
    fn test_non_human_modes_never_color() {
        assert!(!OutputFormatter::new(OutputMode::Json, 0, false).use_colors);
        assert!(!OutputFormatter::new(OutputMode::Plain, 0, false).use_colors);
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 1, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(!formatter.should_show_message(2));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1073741824), "1.0 GB");
    }
}
