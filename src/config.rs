//! Command-line surface and per-run configuration.

use crate::error::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// Given a CSV file or a directory of CSV files and a column to match on a
/// regular expression, print the matching rows and report the top occurring
/// values for selected columns.
#[derive(Debug, Parser)]
#[command(name = "batchcsv", version)]
pub struct Args {
    /// Column to perform the regex match on
    #[arg(long, default_value_t = 0)]
    pub col: usize,

    /// Path to the CSV file or directory of files
    #[arg(long)]
    pub loc: PathBuf,

    /// Regex to match on the provided column
    #[arg(long)]
    pub reg: String,

    /// Number of top values to print per tracked column
    #[arg(long, default_value_t = 10)]
    pub max: usize,

    /// Columns to provide top occurrences for
    #[arg(long, num_args = 1..)]
    pub top: Vec<usize>,

    /// Columns to only print from the matching rows
    #[arg(long, num_args = 1..)]
    pub only: Vec<usize>,

    /// Write matching rows to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Keep processing remaining files when one fails to load
    #[arg(long)]
    pub continue_on_file_error: bool,
}

/// Immutable filter settings for one run.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    /// Column index the pattern is tested against.
    pub column: usize,
    /// Uncompiled pattern; the pipeline compiles it before any row is read.
    pub pattern: String,
    /// Columns to print for each match; empty means the whole row.
    pub projection: Vec<usize>,
    /// Redirect target for matching rows.
    pub output: Option<PathBuf>,
}

/// Validated per-run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub loc: PathBuf,
    pub filter: FilterSpec,
    /// Columns to aggregate, in declaration order, deduplicated.
    pub tracked: Vec<usize>,
    /// Ranking size for the report.
    pub max: usize,
    pub continue_on_file_error: bool,
}

impl Config {
    /// Checks that do not need the input's header. `--top` is deduplicated
    /// preserving first occurrence so a repeated index cannot double count;
    /// `--only` keeps whatever order and repetition the user asked for.
    pub fn from_args(args: Args) -> Result<Self> {
        if !args.loc.exists() {
            return Err(Error::InvalidPath { path: args.loc });
        }
        let mut tracked = Vec::with_capacity(args.top.len());
        for column in args.top {
            if !tracked.contains(&column) {
                tracked.push(column);
            }
        }
        Ok(Self {
            loc: args.loc,
            filter: FilterSpec {
                column: args.col,
                pattern: args.reg,
                projection: args.only,
                output: args.out,
            },
            tracked,
            max: args.max,
            continue_on_file_error: args.continue_on_file_error,
        })
    }

    /// Check every configured column index against the header width. Runs
    /// once per run, as soon as the first file's header is known.
    pub fn validate_columns(&self, header: &[String]) -> Result<()> {
        let width = header.len();
        let check = |flag: &'static str, column: usize| {
            if column >= width {
                Err(Error::ColumnOutOfRange {
                    flag,
                    column,
                    width,
                })
            } else {
                Ok(())
            }
        };
        check("col", self.filter.column)?;
        for &column in &self.tracked {
            check("top", column)?;
        }
        for &column in &self.filter.projection {
            check("only", column)?;
        }
        Ok(())
    }
}
