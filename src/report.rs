//! Final top-N report rendering.

use crate::error::Result;
use crate::stats::RankAggregator;
use std::io::Write;

const TOP_BANNER: &str = "############### TOP ###############";
const END_BANNER: &str = "############### END ###############";

/// Render the aggregated rankings between fixed banner lines: one section
/// per tracked column, in the order the columns were requested. Each section
/// is the column's header label, `count<TAB>value` lines (highest count
/// first), and a trailing blank line. No tracked columns means banners with
/// no sections.
pub fn render<W: Write>(
    writer: &mut W,
    aggregator: Option<&RankAggregator>,
    header: &[String],
    max: usize,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{TOP_BANNER}")?;
    writeln!(writer)?;
    if let Some(aggregator) = aggregator {
        for column in aggregator.tracked() {
            let label = header.get(column).map(String::as_str).unwrap_or("");
            writeln!(writer, "{label}")?;
            for (value, count) in aggregator.top_n(column, max) {
                writeln!(writer, "{count}\t{value}")?;
            }
            writeln!(writer)?;
        }
    }
    writeln!(writer, "{END_BANNER}")?;
    Ok(())
}
