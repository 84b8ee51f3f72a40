use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MASTER_FILE: &str = "post_stats_complete.tsv";

/// Concatenate every per-metric statistics table into one master file, each
/// block under a header derived from its file name. The scan is sorted so the
/// result is a pure function of the input set: rerunning on the same files
/// yields byte-identical output. No-op unless master-file mode is enabled.
pub fn combine(dir: &Path, enabled: bool) -> std::io::Result<Option<PathBuf>> {
    if !enabled {
        return Ok(None);
    }
    let mut inputs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with("post_stats_") && name.ends_with(".tsv") && name != MASTER_FILE
        })
        .collect();
    inputs.sort();

    let master = dir.join(MASTER_FILE);
    let mut out = fs::File::create(&master)?;
    for path in &inputs {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let metric = name
            .trim_start_matches("post_stats_")
            .trim_end_matches(".tsv");
        let contents = fs::read_to_string(path)?;
        writeln!(out, "{}", metric.to_uppercase())?;
        writeln!(out, "{}", contents.trim_end())?;
        writeln!(out)?;
    }
    Ok(Some(master))
}
