//! Estimate command: enriches a log with estimated start times.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use ste_core::{Configuration, EstimationSummary, StartTimeEstimator};

pub fn run<W: Write>(
    writer: &mut W,
    input: &Path,
    output: &Path,
    config: &Configuration,
) -> Result<()> {
    let table = ste_log::read_event_log(input, config)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let estimator = StartTimeEstimator::new(table.log(), config)
        .context("invalid estimation configuration")?;
    let estimated = estimator.estimate();

    ste_log::write_estimated_log(output, &table, &estimated, config)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let summary = estimated.summary();
    tracing::info!(
        events = summary.total(),
        re_estimated = summary.count(ste_core::EstimateSource::ReEstimated),
        output = %output.display(),
        "estimated start times"
    );
    render_summary(writer, &summary)
}

fn render_summary<W: Write>(writer: &mut W, summary: &EstimationSummary) -> Result<()> {
    writeln!(writer, "Estimated start times of {} events", summary.total())?;
    for (source, count) in summary.iter().filter(|(_, count)| *count > 0) {
        writeln!(writer, "- {source}: {count}")?;
    }
    Ok(())
}
