//! Per-column frequency tables and deterministic top-N ranking.

use std::collections::HashMap;

/// Value-to-count map for one tracked column. Entries are created on first
/// observation and only ever incremented.
#[derive(Debug, Default)]
pub struct FrequencyTable {
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    fn bump(&mut self, value: &str) {
        *self.counts.entry(value.to_string()).or_insert(0) += 1;
    }

    /// Sum of all counts: the number of observations this table has seen.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// All entries, descending by count, ties broken by ascending value.
    /// The tie-break makes the order total, so identical inputs always rank
    /// identically.
    fn ranked(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|(value, &count)| (value.clone(), count))
            .collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

/// Frequency tables for the tracked columns, held in declaration order. The
/// pipeline's stat sink is the only writer; the reporter reads the final
/// state once the run has drained.
#[derive(Debug)]
pub struct RankAggregator {
    tables: Vec<(usize, FrequencyTable)>,
}

impl RankAggregator {
    pub fn new(tracked: &[usize]) -> Self {
        Self {
            tables: tracked
                .iter()
                .map(|&column| (column, FrequencyTable::default()))
                .collect(),
        }
    }

    /// Tracked columns in the order they were declared. The report walks
    /// this order, not the map's.
    pub fn tracked(&self) -> impl Iterator<Item = usize> + '_ {
        self.tables.iter().map(|(column, _)| *column)
    }

    pub fn table(&self, column: usize) -> Option<&FrequencyTable> {
        self.tables
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, table)| table)
    }

    /// Increment `value`'s count for `column`. An untracked column is
    /// ignored.
    pub fn observe(&mut self, column: usize, value: &str) {
        if let Some((_, table)) = self.tables.iter_mut().find(|(c, _)| *c == column) {
            table.bump(value);
        }
    }

    /// Record every tracked column of one matching row. A ragged row that
    /// ends before a tracked column contributes nothing to that column.
    pub fn observe_row(&mut self, row: &[String]) {
        for (column, table) in &mut self.tables {
            if let Some(value) = row.get(*column) {
                table.bump(value);
            }
        }
    }

    /// The `n` highest-count values for `column`, fully ordered: descending
    /// count, then ascending value. `n` at or above the distinct-value count
    /// returns everything; a never-observed column returns an empty list.
    pub fn top_n(&self, column: usize, n: usize) -> Vec<(String, u64)> {
        let Some(table) = self.table(column) else {
            return Vec::new();
        };
        let mut entries = table.ranked();
        entries.truncate(n);
        entries
    }
}
