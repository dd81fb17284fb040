//! Command-line interface module for tagfold.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Building the run context from configuration and flags
//! - Dispatching to the reorganizer, the cleaner and undo
//! - Reporting results

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::cleaner::Cleaner;
use crate::config::Settings;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::output::OutputFormatter;
use crate::reorganizer::{CONFIRM_TOKEN, ReorganizeReport, Reorganizer};
use crate::tag::TagFilter;
use crate::undo::UndoManager;

#[derive(Debug, Parser)]
#[command(name = "tagfold", version, about)]
pub struct Cli {
    /// Directory holding the collection folders
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (defaults to ./.tagfoldrc.toml, then ~/.config/tagfold/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Depth for deep traversals, overriding the configuration
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Read audio tags from music files while walking
    #[arg(long)]
    pub music_metadata: bool,

    /// Detect picture formats while walking
    #[arg(long)]
    pub image_metadata: bool,

    /// Increase log output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Move tagged files into their tag folders
    MoveTo {
        /// Only move files carrying one of these tags
        tags: Vec<String>,
    },
    /// Move files out of tag folders back into their collection, re-tagging them
    MoveFro {
        /// Only empty these tag folders
        tags: Vec<String>,
    },
    /// Strip markers at collection level and repair them inside tag folders
    ResetTags {
        /// Confirm renaming across the whole tree
        #[arg(long)]
        yes: bool,
    },
    /// Count files in collection and tag folders
    Count,
    /// Collapse directories whose only entry is another directory
    Flatten,
    /// Remove empty directories
    Clean {
        /// Descend to the configured depth instead of only the root's children
        #[arg(long)]
        deep: bool,
    },
    /// Reverse the last move-to, move-fro or reset-tags run
    Undo,
}

/// Builds the run context: configuration file first, then command-line overrides.
pub fn build_context(cli: &Cli) -> Result<Context> {
    let settings = Settings::load(cli.config.as_deref())?;
    // An absolute root gives the flatten staging area a real parent and the
    // journal stable paths. A missing root is reported later by ensure_root.
    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    let mut ctx = Context::from_settings(root, &settings)?;

    if let Some(depth) = cli.depth {
        ctx.depth = depth;
    }
    ctx.metadata.music |= cli.music_metadata;
    ctx.metadata.image |= cli.image_metadata;

    Ok(ctx)
}

/// Runs one command.
///
/// Returns `Ok(true)` when the command completed without collecting any
/// failure, `Ok(false)` when failures were reported, and `Err` on fatal errors.
pub fn run(cli: &Cli) -> Result<bool> {
    let ctx = build_context(cli)?;
    ctx.ensure_root()?;

    match &cli.command {
        Command::MoveTo { tags } => {
            let filter = TagFilter::only(tags.iter().cloned())?;
            let report = with_progress(&ctx, "move-to", |r| r.move_pictures_to(&filter))?;
            Ok(print_reorganize_report("move-to", &report))
        }
        Command::MoveFro { tags } => {
            let filter = TagFilter::only(tags.iter().cloned())?;
            let report = with_progress(&ctx, "move-fro", |r| r.move_pictures_fro(&filter))?;
            Ok(print_reorganize_report("move-fro", &report))
        }
        Command::ResetTags { yes } => {
            let confirm = if *yes { CONFIRM_TOKEN } else { "" };
            match with_progress(&ctx, "reset-tags", |r| r.reset_tags(confirm)) {
                Ok(report) => Ok(print_reorganize_report("reset-tags", &report)),
                Err(e @ Error::ConfirmationRequired { .. }) => {
                    OutputFormatter::warning(&e.to_string());
                    OutputFormatter::plain(
                        "This renames files across the whole tree. Re-run with --yes to proceed.",
                    );
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        }
        Command::Count => {
            let count = Reorganizer::new(&ctx).count_visible_pictures()?;
            OutputFormatter::success(&format!(
                "{} visible pictures under {}",
                count.total,
                ctx.root.display()
            ));
            print_failures(&count.failures);
            Ok(count.failures.is_empty())
        }
        Command::Flatten => {
            let report = Cleaner::new(&ctx).flatten()?;
            for path in &report.collapsed {
                OutputFormatter::success(&format!("Collapsed {}", relative(&ctx.root, path)));
            }
            OutputFormatter::summary_table(
                "flatten",
                &[
                    ("Collapsed", report.collapsed.len()),
                    ("Passes", report.passes),
                    ("Failed", report.failures.len()),
                ],
            );
            print_failures(&report.failures);
            if let Some(staging) = &report.staging_left {
                OutputFormatter::warning(&format!(
                    "Staged content was left in {}; move it back by hand.",
                    staging.display()
                ));
            }
            Ok(report.is_clean())
        }
        Command::Clean { deep } => {
            let report = Cleaner::new(&ctx).clean(*deep)?;
            for path in &report.removed {
                OutputFormatter::success(&format!("Removed {}", relative(&ctx.root, path)));
            }
            OutputFormatter::summary_table(
                "clean",
                &[
                    ("Removed", report.removed.len()),
                    ("Failed", report.failures.len()),
                ],
            );
            print_failures(&report.failures);
            Ok(report.is_clean())
        }
        Command::Undo => undo(&ctx.root),
    }
}

fn with_progress<F>(ctx: &Context, operation: &str, op: F) -> Result<ReorganizeReport>
where
    F: FnOnce(&Reorganizer) -> Result<ReorganizeReport>,
{
    let pb = OutputFormatter::create_progress_bar(operation);
    let reorganizer = Reorganizer::new(ctx).with_progress(pb.clone());
    let result = op(&reorganizer);
    pb.finish_and_clear();
    result
}

fn print_reorganize_report(operation: &str, report: &ReorganizeReport) -> bool {
    OutputFormatter::summary_table(
        operation,
        &[
            ("Moved", report.moved),
            ("Skipped", report.skipped),
            ("Failed", report.failures.len()),
        ],
    );
    print_failures(&report.failures);
    if !report.journal.is_empty() {
        OutputFormatter::info("History saved. Use 'tagfold undo' to revert this run.");
    }
    report.is_clean()
}

fn print_failures(failures: &[Error]) {
    if failures.is_empty() {
        return;
    }
    OutputFormatter::header("FAILURES");
    for failure in failures {
        OutputFormatter::error(&failure.to_string());
    }
}

fn undo(root: &Path) -> Result<bool> {
    OutputFormatter::info("Undoing previous run...");
    let report = UndoManager::undo(root)?;

    OutputFormatter::success(&format!("Restored: {}", report.restored_files));
    if report.already_restored > 0 {
        OutputFormatter::info(&format!(
            "Already in place from an earlier undo: {}",
            report.already_restored
        ));
    }
    for (original, name) in &report.renamed_files {
        OutputFormatter::warning(&format!(
            "{} was occupied, restored as {}",
            original.display(),
            name
        ));
    }
    for path in &report.skipped_files {
        OutputFormatter::warning(&format!("Skipped {}: file not found", path.display()));
    }
    for (path, e) in &report.failed_restores {
        OutputFormatter::error(&format!("{}: {}", path.display(), e));
    }
    if !report.is_complete_success() {
        OutputFormatter::warning("History file was NOT deleted; fix the issues and try again.");
    }

    Ok(report.is_complete_success())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
