//! Batch processing of files and directories.
//!
//! Each candidate file is trimmed independently. A failure on one file is
//! reported and the batch moves on; cancellation is only observed between
//! files, so a file is never left half-processed.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::epub::{plan_rename, rename_epub};
use crate::trim::{Inspection, TrimMode, TrimOutcome, inspect, trim_file};

/// File extensions the batch picks up, compared case-insensitively.
pub const EXTENSIONS: [&str; 2] = ["zip", "epub"];

/// Settings for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    pub rename: bool,
    pub dry_run: bool,
    pub mode: TrimMode,
    pub quiet: bool,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Cancelled,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Cancelled => 2,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Shared flag set when the user asks to stop.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag on the first Ctrl+C.
    pub fn listen_for_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, stopping after the current file");
                flag.cancel();
            }
        });
    }
}

/// Counts of what happened during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub trimmed: usize,
    pub unchanged: usize,
    pub renamed: usize,
    pub failed: usize,
}

/// Result of trimming one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileReport {
    pub inspection: Inspection,
    /// `None` in a dry run.
    pub outcome: Option<TrimOutcome>,
}

impl FileReport {
    pub fn needs_trim(&self) -> bool {
        match self.outcome {
            Some(outcome) => matches!(outcome, TrimOutcome::Trimmed { .. }),
            None => self.inspection.excess() > 0,
        }
    }
}

/// Expand `paths` into the archive files to process.
///
/// Directories are walked recursively in file-name order. A file is skipped
/// when its own name or the name of any directory above it starts with `.`,
/// including the directories above an argument. Anything without a `.zip` or
/// `.epub` extension is skipped too. A path that does not exist fails the
/// whole collection.
pub fn collect_candidates(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for root in paths {
        if !root.exists() {
            bail!("{} does not exist", root.display());
        }
        if has_hidden_component(&std::path::absolute(root)?) {
            debug!(path = %root.display(), "skipping hidden path");
            continue;
        }

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    eprintln!("Warning: {err}");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !has_archive_extension(path) {
                continue;
            }
            if seen.insert(path.to_path_buf()) {
                files.push(path.to_path_buf());
            }
        }
    }

    Ok(files)
}

/// Whether `path` or any of its ancestors has a hidden name.
pub fn has_hidden_component(path: &Path) -> bool {
    path.ancestors().filter_map(Path::file_name).any(is_hidden)
}

pub fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

pub fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Format a byte count with a binary unit.
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Process every file in `files`, stopping early on cancellation.
pub async fn run(
    files: &[PathBuf],
    options: &BatchOptions,
    cancel: &Cancellation,
) -> (ExitStatus, BatchSummary) {
    let mut summary = BatchSummary::default();

    for path in files {
        if cancel.is_cancelled() {
            return (ExitStatus::Cancelled, summary);
        }

        let report = match trim_one(path, options).await {
            Ok(report) => report,
            Err(err) => {
                summary.failed += 1;
                report_failure(path, &err);
                continue;
            }
        };
        if report.needs_trim() {
            summary.trimmed += 1;
        } else {
            summary.unchanged += 1;
        }

        if options.rename && !cancel.is_cancelled() {
            match rename_one(path, &report.inspection, options).await {
                Ok(Some(_)) => summary.renamed += 1,
                Ok(None) => {}
                Err(err) => {
                    summary.failed += 1;
                    report_failure(path, &err);
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return (ExitStatus::Cancelled, summary);
    }
    (ExitStatus::Success, summary)
}

fn report_failure(path: &Path, err: &anyhow::Error) {
    warn!(path = %path.display(), error = %format!("{err:#}"), "failed to process file");
    eprintln!("Error: {}: {:#}", path.display(), err);
}

/// Trim one file, or only inspect it in a dry run.
pub async fn trim_one(path: &Path, options: &BatchOptions) -> Result<FileReport> {
    let owned = path.to_path_buf();
    let (dry_run, mode) = (options.dry_run, options.mode);

    let (inspection, outcome) = tokio::task::spawn_blocking(move || {
        if dry_run {
            inspect(&owned).map(|inspection| (inspection, None))
        } else {
            trim_file(&owned, mode).map(|(inspection, outcome)| (inspection, Some(outcome)))
        }
    })
    .await??;

    let report = FileReport {
        inspection,
        outcome,
    };

    if report.needs_trim() {
        info!(
            path = %path.display(),
            len = inspection.len,
            logical_end = inspection.logical_end(),
            dry_run,
            "trailing bytes found"
        );
        if !options.quiet {
            let name = display_name(path);
            if dry_run {
                println!("Would trim: {} ({} trailing)", name, format_size(inspection.excess()));
            } else {
                println!("Trimmed: {}", name);
            }
        }
    } else {
        debug!(path = %path.display(), "already minimal");
    }

    Ok(report)
}

/// Rename an EPUB after its metadata, or only plan the rename in a dry run.
pub async fn rename_one(
    path: &Path,
    inspection: &Inspection,
    options: &BatchOptions,
) -> Result<Option<PathBuf>> {
    let destination = if options.dry_run {
        plan_rename(path, inspection.logical_end()).await?
    } else {
        rename_epub(path).await?
    };

    if let Some(destination) = &destination {
        info!(from = %path.display(), to = %destination.display(), dry_run = options.dry_run, "renamed");
        if !options.quiet {
            let verb = if options.dry_run { "Would rename" } else { "Renamed" };
            println!("{}: {} -> {}", verb, display_name(path), display_name(destination));
        }
    }

    Ok(destination)
}
