use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::record::Record;

const STDIN_MARKER: &str = "-";

/// Loads records from a JSON array or JSON Lines file, or stdin for `-`.
#[tracing::instrument(skip(path), fields(file = %path.display()))]
pub fn load_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let (text, origin) = if path.as_os_str() == STDIN_MARKER {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed reading records from stdin")?;
        (buf, "<stdin>".to_string())
    } else {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        (text, path.display().to_string())
    };

    let records = parse_records(&text, &origin)?;
    check_records(&records);
    info!(count = records.len(), source = %origin, "loaded records");
    Ok(records)
}

/// Parses record text; `origin` only labels error messages.
pub fn parse_records(text: &str, origin: &str) -> anyhow::Result<Vec<Record>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        debug!(origin, "parsing json array");
        return serde_json::from_str(trimmed).with_context(|| format!("failed parsing {origin} as a JSON array"));
    }

    debug!(origin, "parsing jsonl");
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: Record =
            serde_json::from_str(trimmed).with_context(|| format!("failed parsing {origin} line {}", idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

fn check_records(records: &[Record]) {
    let mut seen = HashSet::new();
    for record in records {
        if record.is_inverted() {
            warn!(
                id = %record.id,
                start = %record.start,
                end = %record.end,
                "record ends before it starts; using the reversed span"
            );
        }
        if !seen.insert(record.id.as_str()) {
            warn!(id = %record.id, "duplicate record id");
        }
    }
}

/// Writes `bytes` to `path` through a temporary file in the same directory.
#[tracing::instrument(skip(path, bytes), fields(file = %path.display(), len = bytes.len()))]
pub fn write_output_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    temp.write_all(bytes)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    debug!("wrote output");
    Ok(())
}
