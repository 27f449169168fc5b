//! Regex filtering of one column of a row.

use crate::error::{Error, Result};
use regex::Regex;

/// Compiled filter: which column to test and the pattern to test it with.
#[derive(Debug, Clone)]
pub struct Matcher {
    column: usize,
    regex: Regex,
}

impl Matcher {
    /// Compile `pattern` eagerly; a pattern that does not compile aborts the
    /// run before any row is read.
    pub fn new(column: usize, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { column, regex })
    }

    /// Test the filter column of `row`, exactly as it appears in the file:
    /// no trimming, no case folding. `line` is the 1-based file line, used
    /// when the row ends before the filter column.
    pub fn matches(&self, row: &[String], line: usize) -> Result<bool> {
        let field = row.get(self.column).ok_or(Error::InvalidColumn {
            line,
            column: self.column,
            width: row.len(),
        })?;
        Ok(self.regex.is_match(field))
    }
}
