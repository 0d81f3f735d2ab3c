//! Output artifact discovery
//!
//! The working directory is the source of truth for what a job produced: the
//! external tool creates the files, so they are rediscovered by scanning on
//! every request rather than tracked in memory.

use std::path::{Path, PathBuf};

/// Whether `path` has one of the allowed extensions (case-insensitive)
pub fn is_artifact(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

/// List the artifacts directly inside `dir`, sorted by file name
///
/// Subdirectories and partial downloads (any other extension) are ignored.
pub fn list_artifacts(dir: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_artifact(&path, extensions) {
            found.push(path);
        }
    }
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(found)
}

/// Count the artifacts inside `dir`; a missing or unreadable directory counts as 0
pub fn count_artifacts(dir: &Path, extensions: &[String]) -> u32 {
    match list_artifacts(dir, extensions) {
        Ok(files) => u32::try_from(files.len()).unwrap_or(u32::MAX),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(dir = %dir.display(), error = %e, "failed to scan working directory");
            }
            0
        }
    }
}

/// Content type served for a delivered file
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "opus" => "audio/opus",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
