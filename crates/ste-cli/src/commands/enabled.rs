//! Enabled command: writes the enabled time of every event.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use ste_core::{ConcurrencyOracle, Configuration};

pub fn run<W: Write>(
    writer: &mut W,
    input: &Path,
    output: &Path,
    unknown_as_trace_start: bool,
    config: &Configuration,
) -> Result<()> {
    config.validate().context("invalid estimation configuration")?;
    let table = ste_log::read_event_log(input, config)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let oracle = ConcurrencyOracle::from_log(table.log(), config);
    let enabled = oracle.enabled_times(table.log(), unknown_as_trace_start);

    ste_log::write_enabled_times(output, &table, &enabled, config)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let known = enabled.iter().filter(|time| time.is_some()).count();
    tracing::info!(events = enabled.len(), known, "computed enabled times");
    writeln!(
        writer,
        "Enabled times of {} events ({known} known)",
        enabled.len()
    )?;
    Ok(())
}
