//! Loading candidate transactions from a mempool directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use assembler_core::{RawTransactionRecord, TransactionRecord};
use tracing::{debug, warn};

/// Load every usable transaction file in `dir`, in file-name order.
///
/// Files that are not JSON objects with a `hex` field are skipped, as are
/// files whose fields fail validation. Only directory access errors abort.
pub fn load_mempool(dir: &Path) -> Result<Vec<TransactionRecord>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("reading mempool directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()
        .with_context(|| format!("listing mempool directory {}", dir.display()))?;
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths.iter().filter(|p| p.is_file()) {
        match load_record(path) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => debug!(path = %path.display(), "skipping file without transaction hex"),
            Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "skipping unreadable transaction file"),
        }
    }

    Ok(records)
}

fn load_record(path: &Path) -> Result<Option<TransactionRecord>> {
    let contents = fs::read_to_string(path).context("reading file")?;
    let value: serde_json::Value = serde_json::from_str(&contents).context("parsing JSON")?;

    if value.get("hex").is_none() {
        return Ok(None);
    }

    let raw: RawTransactionRecord = serde_json::from_value(value).context("decoding record fields")?;
    let record = TransactionRecord::try_from(raw)?;
    Ok(Some(record))
}
