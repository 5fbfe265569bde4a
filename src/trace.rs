/*
CSV command-trace reader.

One command per line: `timestamp,mnemonic[,rank[,bank_group[,bank[,row[,column]]]]]`.
Trailing fields default to zero, `#` starts a comment, blank lines are
skipped.  Timestamps must be non-decreasing; the engine does not defend
against out-of-order input, so it is rejected here at the boundary.
*/

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::command::{CmdType, Command, TargetCoordinate};
use crate::interval::Cycle;

pub fn parse_line(line: &str) -> Result<Command> {
    let mut fields = line.split(',').map(str::trim);

    let timestamp: Cycle = match fields.next() {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .with_context(|| format!("bad timestamp '{}'", raw))?,
        _ => bail!("missing timestamp"),
    };
    let kind: CmdType = match fields.next() {
        Some(raw) if !raw.is_empty() => raw.parse().map_err(anyhow::Error::msg)?,
        _ => bail!("missing command mnemonic"),
    };

    let mut coord = [0usize; 5];
    for slot in coord.iter_mut() {
        match fields.next() {
            Some(raw) if !raw.is_empty() => {
                *slot = raw
                    .parse()
                    .with_context(|| format!("bad target field '{}'", raw))?;
            }
            Some(_) | None => break,
        }
    }
    let [rank, bank_group, bank, row, column] = coord;

    Ok(Command::new(
        timestamp,
        kind,
        TargetCoordinate {
            rank,
            bank_group,
            bank,
            row,
            column,
        },
    ))
}

pub fn parse_trace(raw: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    let mut last_timestamp = 0;
    for (index, line) in raw.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let cmd = parse_line(line).with_context(|| format!("trace line {}", index + 1))?;
        ensure!(
            cmd.timestamp >= last_timestamp,
            "trace line {}: timestamp {} goes backwards (previous {})",
            index + 1,
            cmd.timestamp,
            last_timestamp
        );
        last_timestamp = cmd.timestamp;
        commands.push(cmd);
    }
    Ok(commands)
}

pub fn read_trace(path: &Path) -> Result<Vec<Command>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&raw)
}
