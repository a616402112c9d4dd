use clap::Parser;
use std::path::PathBuf;

use crate::batch::BatchOptions;
use crate::trim::TrimMode;

#[derive(Parser, Debug)]
#[command(name = "trimzip")]
#[command(version)]
#[command(about = "Strip trailing garbage from ZIP and EPUB archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  trimzip book.epub              trim one file in place\n  \
  trimzip -r ~/Books             trim and rename every EPUB under ~/Books\n  \
  trimzip -n archive.zip         report what would be trimmed")]
pub struct Cli {
    /// Files or directories to process
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Rename EPUB files after their title and creators
    #[arg(short = 'r', long)]
    pub rename: bool,

    /// Report what would change without touching any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Shrink files in place instead of writing a copy and replacing
    #[arg(long)]
    pub in_place: bool,

    /// Show debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Suppress per-file messages
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn options(&self) -> BatchOptions {
        BatchOptions {
            rename: self.rename,
            dry_run: self.dry_run,
            mode: if self.in_place {
                TrimMode::InPlace
            } else {
                TrimMode::Replace
            },
            quiet: self.quiet,
        }
    }
}
