//! Packaging of multi-file job output

use crate::artifacts::list_artifacts;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive extension, appended to the caller's base name
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Base name for an archive: `<prefix>_<YYYYmmdd_HHMMSS>` in local time
pub fn archive_base_name(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Builds one archive per call from the artifacts of a working directory
#[derive(Clone, Debug)]
pub struct ArchiveBuilder {
    extensions: Vec<String>,
}

impl ArchiveBuilder {
    /// Create a builder that packages files with the given extensions
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Package every artifact of `dir` into `<dir>/<base_name>.zip`
    ///
    /// Entries are stored flat under their file names, in name order. Logs and
    /// other non-artifact files are left out, and so is the archive itself.
    /// Returns `Ok(None)` when there is nothing to package.
    ///
    /// # Errors
    ///
    /// [`Error::Archive`] if the directory cannot be read or the archive cannot
    /// be written. A partially written archive is removed.
    pub async fn build(&self, dir: &Path, base_name: &str) -> Result<Option<PathBuf>> {
        let dir = dir.to_path_buf();
        let archive_path = dir.join(format!("{base_name}.{ARCHIVE_EXTENSION}"));
        let extensions = self.extensions.clone();

        let path = archive_path.clone();
        tokio::task::spawn_blocking(move || build_blocking(&dir, &path, &extensions))
            .await
            .map_err(|e| Error::Archive {
                path: archive_path,
                reason: format!("archive task failed: {e}"),
            })?
    }
}

fn build_blocking(dir: &Path, archive_path: &Path, extensions: &[String]) -> Result<Option<PathBuf>> {
    let files = list_artifacts(dir, extensions).map_err(|e| Error::Archive {
        path: archive_path.to_path_buf(),
        reason: format!("failed to scan {}: {}", dir.display(), e),
    })?;

    if files.is_empty() {
        return Ok(None);
    }

    if let Err(reason) = write_archive(archive_path, &files) {
        if let Err(e) = std::fs::remove_file(archive_path)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %archive_path.display(), error = %e, "failed to remove partial archive");
        }
        return Err(Error::Archive {
            path: archive_path.to_path_buf(),
            reason,
        });
    }

    tracing::info!(
        archive = %archive_path.display(),
        entries = files.len(),
        "archive built"
    );
    Ok(Some(archive_path.to_path_buf()))
}

fn write_archive(archive_path: &Path, files: &[PathBuf]) -> std::result::Result<(), String> {
    let out = File::create(archive_path).map_err(|e| format!("create failed: {e}"))?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    let mut used = HashSet::new();

    for file in files {
        let name = entry_name(file, &mut used);
        let name = name.as_str();

        let mut input = File::open(file).map_err(|e| format!("open {name}: {e}"))?;
        let size = input
            .metadata()
            .map_err(|e| format!("stat {name}: {e}"))?
            .len();

        // Media is already compressed, so entries are stored as-is
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(size >= u64::from(u32::MAX));

        writer
            .start_file(name, options)
            .map_err(|e| format!("add {name}: {e}"))?;
        io::copy(&mut input, &mut writer).map_err(|e| format!("write {name}: {e}"))?;
    }

    writer
        .finish()
        .map_err(|e| format!("finish failed: {e}"))?
        .into_inner()
        .map_err(|e| format!("flush failed: {}", e.error()))?
        .sync_all()
        .map_err(|e| format!("sync failed: {e}"))?;
    Ok(())
}

/// Entry name for `file`: its file name, lossily converted to UTF-8
///
/// Names that collide after conversion get a ` (n)` suffix before the
/// extension so every artifact keeps its own entry.
fn entry_name(file: &Path, used: &mut HashSet<String>) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if used.insert(name.clone()) {
        return name;
    }

    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = Path::new(&name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
