use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use hashbrown::HashMap;

use crate::declare::KeyMetrics;

/// Persists a batch result as pretty-printed UTF-8 JSON.
///
/// The document is written to a sibling temp file and renamed into place, so
/// a crash mid-write never leaves a truncated file at the target path.
pub fn save_to_json<P: AsRef<Path>>(path: P, metrics: &HashMap<String, KeyMetrics>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(metrics)
        .map_err(|why| anyhow!("Failed to serialize metrics because {:?}", why))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json.as_bytes()).map_err(|why| {
        anyhow!(
            "Failed to write {} because {:?}",
            tmp_path.to_string_lossy(),
            why
        )
    })?;

    fs::rename(&tmp_path, path).map_err(|why| {
        anyhow!(
            "Failed to rename {} to {} because {:?}",
            tmp_path.to_string_lossy(),
            path.to_string_lossy(),
            why
        )
    })
}
