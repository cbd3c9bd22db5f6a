//! Concurrency command: prints the relation mined from a log.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use ste_core::{ConcurrencyOracle, Configuration};

pub fn run<W: Write>(
    writer: &mut W,
    input: &Path,
    json: bool,
    config: &Configuration,
) -> Result<()> {
    config.validate().context("invalid estimation configuration")?;
    let table = ste_log::read_event_log(input, config)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let oracle = ConcurrencyOracle::from_log(table.log(), config);
    render(writer, &oracle, json)
}

fn render<W: Write>(writer: &mut W, oracle: &ConcurrencyOracle, json: bool) -> Result<()> {
    let relation = oracle.relation();
    if json {
        serde_json::to_writer_pretty(&mut *writer, relation)
            .context("failed to serialize concurrency relation")?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "Concurrency oracle: {}", oracle.kind())?;
    if relation.pair_count() == 0 {
        writeln!(writer, "No concurrent activities.")?;
        return Ok(());
    }

    writeln!(writer, "Concurrent pairs: {}", relation.pair_count())?;
    for (activity, concurrent) in relation.iter() {
        if concurrent.is_empty() {
            continue;
        }
        let names: Vec<&str> = concurrent.iter().map(String::as_str).collect();
        writeln!(writer, "- {activity}: {}", names.join(", "))?;
    }
    Ok(())
}
