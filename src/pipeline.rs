//! Streaming match/aggregate pipeline.
//!
//! Files are processed sequentially; within a file, one producer streams
//! rows through the matcher and fans every match out to two queue-fed sinks:
//! one renders matches, the other feeds the rank aggregator. Dropping the
//! queue senders is the producer-complete signal; joining the sink tasks is
//! the barrier after which the aggregator is safe to read.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::source::{self, Table};
use crate::stats::RankAggregator;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info};

/// Queue capacity per sink; a full queue suspends the producer.
const SINK_QUEUE: usize = 1024;

/// Destination for rendered matches.
pub enum MatchWriter {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl MatchWriter {
    fn open(output: Option<&Path>) -> Result<Self> {
        match output {
            None => Ok(MatchWriter::Stdout(io::stdout())),
            Some(path) => {
                let file = File::create(path).map_err(|source| Error::UnreadableFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(MatchWriter::File(BufWriter::new(file)))
            }
        }
    }
}

impl Write for MatchWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            MatchWriter::Stdout(w) => w.write(buf),
            MatchWriter::File(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            MatchWriter::Stdout(w) => w.flush(),
            MatchWriter::File(w) => w.flush(),
        }
    }
}

/// What a completed run saw.
#[derive(Debug)]
pub struct RunOutcome {
    /// Files fully processed.
    pub files: usize,
    /// Rows streamed through the matcher.
    pub rows: u64,
    /// Rows that matched the filter.
    pub matched: u64,
    /// Label header, captured from the first successfully loaded file.
    pub header: Vec<String>,
    /// Final frequency state; `None` when no columns were tracked.
    pub aggregator: Option<RankAggregator>,
}

/// Per-run orchestration state: the compiled filter, the match destination
/// and the aggregator all live here, so separate runs cannot share state.
pub struct Pipeline {
    config: Config,
    matcher: Matcher,
    writer: MatchWriter,
    aggregator: Option<RankAggregator>,
}

impl Pipeline {
    /// Compile the filter and open the match destination. A pattern that
    /// does not compile aborts here, before any file is read.
    pub fn new(config: Config) -> Result<Self> {
        let matcher = Matcher::new(config.filter.column, &config.filter.pattern)?;
        let writer = MatchWriter::open(config.filter.output.as_deref())?;
        let aggregator = if config.tracked.is_empty() {
            None
        } else {
            Some(RankAggregator::new(&config.tracked))
        };
        Ok(Self {
            config,
            matcher,
            writer,
            aggregator,
        })
    }

    /// Process every file in order. Within a file the producer and sinks run
    /// concurrently; the next file starts only after both sinks have drained
    /// everything dispatched for the current one.
    pub async fn run(self, files: &[PathBuf]) -> Result<RunOutcome> {
        let Pipeline {
            config,
            matcher,
            mut writer,
            mut aggregator,
        } = self;

        let mut header: Option<Vec<String>> = None;
        let mut total_rows = 0u64;
        let mut total_matched = 0u64;
        let mut files_done = 0usize;

        for path in files {
            let start = Instant::now();
            let loaded = tokio::task::spawn_blocking({
                let path = path.clone();
                move || source::load(&path)
            })
            .await?;
            let table = match loaded {
                Ok(table) => table,
                Err(err) if config.continue_on_file_error => {
                    error!(path = %path.display(), "skipping file: {err}");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if header.is_none() {
                config.validate_columns(&table.header)?;
                header = Some(table.header.clone());
            }

            let (w, agg, rows, matched) = run_file(
                &matcher,
                &config.filter.projection,
                table,
                writer,
                aggregator,
            )
            .await?;
            writer = w;
            aggregator = agg;
            total_rows += rows;
            total_matched += matched;
            files_done += 1;
            info!(
                path = %path.display(),
                rows,
                matched,
                elapsed = ?start.elapsed(),
                "file done"
            );
        }

        Ok(RunOutcome {
            files: files_done,
            rows: total_rows,
            matched: total_matched,
            header: header.unwrap_or_default(),
            aggregator,
        })
    }
}

/// Producer/sink round for one table. The producer filters rows on the
/// current task while the sinks drain their queues concurrently; ownership
/// of the writer and the aggregator moves into the sink tasks and comes back
/// when they finish.
async fn run_file<W>(
    matcher: &Matcher,
    projection: &[usize],
    table: Table,
    writer: W,
    aggregator: Option<RankAggregator>,
) -> Result<(W, Option<RankAggregator>, u64, u64)>
where
    W: Write + Send + 'static,
{
    let (match_tx, mut match_rx) = mpsc::channel::<Vec<String>>(SINK_QUEUE);
    let projection = projection.to_vec();
    let render = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(row) = match_rx.recv().await {
            render_row(&mut writer, &row, &projection)?;
        }
        writer.flush()?;
        Ok::<W, Error>(writer)
    });

    let stat = aggregator.map(|mut aggregator| {
        let (stat_tx, mut stat_rx) = mpsc::channel::<Vec<String>>(SINK_QUEUE);
        let handle = tokio::spawn(async move {
            while let Some(row) = stat_rx.recv().await {
                aggregator.observe_row(&row);
            }
            aggregator
        });
        (stat_tx, handle)
    });

    let rows = table.rows.len() as u64;
    let mut matched = 0u64;
    let mut produce_err = None;
    for (index, row) in table.rows.into_iter().enumerate() {
        // data rows start at line 2; line 1 is the header
        match matcher.matches(&row, index + 2) {
            Ok(false) => {}
            Ok(true) => {
                matched += 1;
                if let Some((stat_tx, _)) = &stat {
                    if stat_tx.send(row.clone()).await.is_err() {
                        break;
                    }
                }
                if match_tx.send(row).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                produce_err = Some(err);
                break;
            }
        }
    }

    drop(match_tx);
    let aggregator = match stat {
        Some((stat_tx, handle)) => {
            drop(stat_tx);
            Some(handle.await?)
        }
        None => None,
    };
    let writer = render.await??;

    if let Some(err) = produce_err {
        return Err(err);
    }
    Ok((writer, aggregator, rows, matched))
}

/// Render one match: the projected columns in the order requested, or the
/// whole row with empty fields dropped. Fields are comma-joined; a projected
/// column a ragged row does not have renders empty.
fn render_row<W: Write>(writer: &mut W, row: &[String], projection: &[usize]) -> Result<()> {
    let line = if projection.is_empty() {
        row.iter()
            .filter(|field| !field.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    } else {
        projection
            .iter()
            .map(|&column| row.get(column).map(String::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",")
    };
    writeln!(writer, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterSpec;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    fn table_of(header: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            path: PathBuf::from("test.csv"),
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn config(loc: PathBuf, filter: FilterSpec, tracked: Vec<usize>) -> Config {
        Config {
            loc,
            filter,
            tracked,
            max: 10,
            continue_on_file_error: false,
        }
    }

    #[tokio::test]
    async fn matches_render_in_source_order_and_feed_stats() -> Result<()> {
        let matcher = Matcher::new(0, "1")?;
        let table = table_of(&["a", "b"], &[&["1", "x"], &["2", "x"], &["1", "y"]]);
        let (out, agg, rows, matched) =
            run_file(&matcher, &[], table, Vec::new(), Some(RankAggregator::new(&[1]))).await?;
        assert_eq!((rows, matched), (3, 2));
        assert_eq!(String::from_utf8(out)?, "1,x\n1,y\n");
        let agg = agg.expect("stat sink hands the aggregator back");
        assert_eq!(
            agg.top_n(1, 10),
            vec![("x".to_string(), 1), ("y".to_string(), 1)]
        );
        assert_eq!(agg.table(1).map(|t| t.total()), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn projection_renders_requested_columns_only() -> Result<()> {
        let matcher = Matcher::new(0, "1")?;
        let table = table_of(&["a", "b"], &[&["1", "x"], &["2", "x"], &["1", "y"]]);
        let (out, _, _, _) = run_file(&matcher, &[1], table, Vec::new(), None).await?;
        assert_eq!(String::from_utf8(out)?, "x\ny\n");
        Ok(())
    }

    #[tokio::test]
    async fn full_rows_drop_empty_fields() -> Result<()> {
        let matcher = Matcher::new(0, "1")?;
        let table = table_of(&["a", "b", "c"], &[&["1", "", "z"]]);
        let (out, _, _, _) = run_file(&matcher, &[], table, Vec::new(), None).await?;
        assert_eq!(String::from_utf8(out)?, "1,z\n");
        Ok(())
    }

    #[tokio::test]
    async fn short_row_at_the_filter_column_aborts() -> Result<()> {
        let matcher = Matcher::new(1, "x")?;
        let table = table_of(&["a", "b", "c"], &[&["1", "x", "y"], &["2"]]);
        let err = run_file(&matcher, &[], table, Vec::<u8>::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidColumn {
                line: 3,
                column: 1,
                width: 1
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn no_tracked_columns_means_no_stat_sink() -> Result<()> {
        let matcher = Matcher::new(0, ".")?;
        let table = table_of(&["a"], &[&["1"], &["2"]]);
        let (out, agg, _, matched) = run_file(&matcher, &[], table, Vec::new(), None).await?;
        assert!(agg.is_none());
        assert_eq!(matched, 2);
        assert_eq!(String::from_utf8(out)?, "1\n2\n");
        Ok(())
    }

    #[tokio::test]
    async fn run_accumulates_across_files() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.csv"), "a,b\n1,x\n")?;
        fs::write(dir.path().join("b.csv"), "a,b\n1,x\n1,y\n2,z\n")?;
        let out_path = dir.path().join("matches.out");
        let config = config(
            dir.path().to_path_buf(),
            FilterSpec {
                column: 0,
                pattern: "1".to_string(),
                projection: Vec::new(),
                output: Some(out_path.clone()),
            },
            vec![1],
        );
        let files = source::discover(&config.loc)?;
        let outcome = Pipeline::new(config)?.run(&files).await?;

        assert_eq!(outcome.files, 2);
        assert_eq!(outcome.rows, 4);
        assert_eq!(outcome.matched, 3);
        assert_eq!(outcome.header, vec!["a", "b"]);
        assert_eq!(fs::read_to_string(&out_path)?, "1,x\n1,x\n1,y\n");
        let agg = outcome.aggregator.expect("tracked column");
        assert_eq!(
            agg.top_n(1, 10),
            vec![("x".to_string(), 2), ("y".to_string(), 1)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn bad_file_aborts_the_run_by_default() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.csv"), "")?;
        fs::write(dir.path().join("b.csv"), "a,b\n1,x\n")?;
        let out_path = dir.path().join("matches.out");
        let config = config(
            dir.path().to_path_buf(),
            FilterSpec {
                column: 0,
                pattern: "1".to_string(),
                projection: Vec::new(),
                output: Some(out_path),
            },
            Vec::new(),
        );
        let files = source::discover(&config.loc)?;
        let err = Pipeline::new(config)?.run(&files).await.unwrap_err();
        assert!(matches!(err, Error::MissingHeader { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn continue_on_file_error_skips_bad_files() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.csv"), "")?;
        fs::write(dir.path().join("b.csv"), "a,b\n1,x\n")?;
        let out_path = dir.path().join("matches.out");
        let mut config = config(
            dir.path().to_path_buf(),
            FilterSpec {
                column: 0,
                pattern: "1".to_string(),
                projection: Vec::new(),
                output: Some(out_path.clone()),
            },
            Vec::new(),
        );
        config.continue_on_file_error = true;
        let files = source::discover(&config.loc)?;
        let outcome = Pipeline::new(config)?.run(&files).await?;

        // header comes from the first file that actually loaded
        assert_eq!(outcome.files, 1);
        assert_eq!(outcome.header, vec!["a", "b"]);
        assert_eq!(fs::read_to_string(&out_path)?, "1,x\n");
        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_config_column_is_rejected_at_the_first_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("a.csv");
        fs::write(&path, "a,b\n1,x\n")?;
        let out_path = dir.path().join("matches.out");
        let config = config(
            path.clone(),
            FilterSpec {
                column: 0,
                pattern: "1".to_string(),
                projection: Vec::new(),
                output: Some(out_path),
            },
            vec![9],
        );
        let err = Pipeline::new(config)?.run(&[path]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnOutOfRange {
                flag: "top",
                column: 9,
                width: 2
            }
        ));
        Ok(())
    }
}
