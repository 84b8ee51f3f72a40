use std::fs;
use std::path::{Path, PathBuf};

use crate::helper::error::SetupError;
use crate::helper::logging::LOG_FILE;

/// Per-sample result files: every `.tsv` in the input directory that is not
/// the group-assignment table or a pipeline artifact. Sorted so the
/// processing order is stable across runs.
pub fn find_sample_files(dir: &Path, metadata_name: &str) -> Result<Vec<PathBuf>, SetupError> {
    if !dir.is_dir() {
        return Err(SetupError::NotADirectory(dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".tsv") {
            continue;
        }
        if name == metadata_name || name.contains("metadata") {
            continue;
        }
        if name.starts_with("pre_") || name.starts_with("post_") {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Remove old `.tsv` artifacts with the given prefix. Missing files are not
/// an error.
pub fn remove_prefixed(dir: &Path, prefix: &str) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(".tsv") && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Remove the previous run's diagnostic log, if any.
pub fn remove_old_log(dir: &Path) {
    let _ = fs::remove_file(dir.join(LOG_FILE));
}
