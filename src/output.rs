//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables. Library diagnostics emitted through
//! the `log` facade are routed here by [`ConsoleLogger`].

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for operations
/// - Summary tables with per-outcome counts
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tagfold::output::OutputFormatter;
    /// OutputFormatter::success("Moved 12 pictures into tag folders");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar over collection folders.
    ///
    /// The length starts at zero and grows as folders are discovered.
    ///
    /// ```no_run
    /// use tagfold::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar("move-to");
    /// pb.inc_length(1);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(operation: &str) -> ProgressBar {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb.set_message(format!("{} collections", operation));
        pb
    }

    /// Prints a two-column summary table.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tagfold::output::OutputFormatter;
    /// OutputFormatter::summary_table("move-to", &[("Moved", 15), ("Skipped", 8), ("Failed", 0)]);
    /// ```
    pub fn summary_table(title: &str, rows: &[(&str, usize)]) {
        Self::header(&format!("SUMMARY: {}", title));

        let width = rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0)
            .max(7);

        println!("{}", "-".repeat(width + 10));
        for (label, count) in rows {
            let count = if *label == "Failed" && *count > 0 {
                count.to_string().red()
            } else {
                count.to_string().green()
            };
            println!("{:<width$} | {}", label, count, width = width);
        }
        println!("{}", "-".repeat(width + 10));
    }
}

/// Writes `log` records to the terminal through [`OutputFormatter`].
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl ConsoleLogger {
    /// Installs the logger. `verbosity` counts `-v` flags: warnings are always
    /// shown, `-v` adds per-operation summaries, `-vv` every mutation.
    pub fn init(verbosity: u8) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(Self::level_for(verbosity));
        Ok(())
    }

    pub fn level_for(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        match record.level() {
            Level::Error => OutputFormatter::error(&message),
            Level::Warn => OutputFormatter::warning(&message),
            Level::Info => OutputFormatter::info(&message),
            Level::Debug | Level::Trace => {
                eprintln!("{} {}", record.target().dimmed(), message.dimmed())
            }
        }
    }

    fn flush(&self) {}
}
