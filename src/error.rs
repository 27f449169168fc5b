use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can end a run early. Configuration mistakes exit 2, file
/// and data failures exit 1; nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: not a valid path to a file nor directory", .path.display())]
    InvalidPath { path: PathBuf },

    #[error("--{flag} {column}: column is out of range for a header with {width} fields")]
    ColumnOutOfRange {
        flag: &'static str,
        column: usize,
        width: usize,
    },

    #[error("{pattern}: not a valid regular expression")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("line {line}: match column {column} is out of range for a row with {width} fields")]
    InvalidColumn {
        line: usize,
        column: usize,
        width: usize,
    },

    #[error("unable to open {}", .path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse {} as CSV", .path.display())]
    MalformedTable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: no header row, file is empty", .path.display())]
    MissingHeader { path: PathBuf },

    #[error("writing output failed")]
    Output {
        #[from]
        source: io::Error,
    },

    #[error("pipeline task failed")]
    Task {
        #[from]
        source: JoinError,
    },
}

impl Error {
    /// Process exit code for this failure: 2 for configuration mistakes,
    /// 1 for file and data failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidPath { .. }
            | Error::ColumnOutOfRange { .. }
            | Error::InvalidPattern { .. } => 2,
            _ => 1,
        }
    }
}
