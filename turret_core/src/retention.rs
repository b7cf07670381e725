//! Bounded FIFO over the files of one directory.
//!
//! Used for the capture directory after every write and for the log
//! directory at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Files in `dir` whose extension matches `extension` (no leading dot,
/// case-insensitive), oldest first. Ties on mtime are broken by file name.
pub fn list_by_age(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let want = extension.trim_start_matches('.');
    list_by_age_matching(dir, |path| {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(want))
    })
}

/// Regular files in `dir` accepted by `keep`, oldest first.
pub fn list_by_age_matching(
    dir: &Path,
    keep: impl Fn(&Path) -> bool,
) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !keep(&path) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((mtime, path));
    }
    files.sort();
    Ok(files.into_iter().map(|(_, p)| p).collect())
}

/// Delete the oldest matching files until at most `max_count` remain.
///
/// A missing directory is created and nothing is removed. A file that
/// cannot be removed is logged and skipped. Returns the removed paths.
pub fn evict_oldest(dir: &Path, extension: &str, max_count: usize) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(Vec::new());
    }
    remove_excess(list_by_age(dir, extension)?, max_count)
}

/// `evict_oldest` over the files whose name starts with `prefix`, for
/// rolled log files such as `turret.log.2026-10-18`.
pub fn evict_oldest_with_prefix(
    dir: &Path,
    prefix: &str,
    max_count: usize,
) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(Vec::new());
    }
    let files = list_by_age_matching(dir, |path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix))
    })?;
    remove_excess(files, max_count)
}

fn remove_excess(files: Vec<PathBuf>, max_count: usize) -> io::Result<Vec<PathBuf>> {
    let excess = files.len().saturating_sub(max_count);
    let mut removed = Vec::with_capacity(excess);
    for path in files.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "evicted");
                removed.push(path);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "eviction failed");
            }
        }
    }
    Ok(removed)
}
