//! Copy-if-newer video store beside the ledger

use crate::services::dataset_scanner::DatasetFolder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What [`copy_if_newer`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    /// Destination exists and is not older than the source
    UpToDate,
}

/// Copy `src` to `dest` when `dest` is missing or strictly older than `src`
///
/// Modification time is the only comparison; the copy keeps the source mtime so a
/// second call is a no-op.
pub fn copy_if_newer(src: &Path, dest: &Path) -> io::Result<CopyOutcome> {
    let src_modified = fs::metadata(src)?.modified()?;

    if let Some(dest_modified) = modified_time(dest)? {
        if dest_modified >= src_modified {
            tracing::debug!(dest = %dest.display(), "Video copy up to date");
            return Ok(CopyOutcome::UpToDate);
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)?;
    fs::File::options()
        .write(true)
        .open(dest)?
        .set_modified(src_modified)?;

    tracing::info!(
        src = %src.display(),
        dest = %dest.display(),
        "Copied video"
    );
    Ok(CopyOutcome::Copied)
}

fn modified_time(path: &Path) -> io::Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.modified()?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Index and path of the first folder holding `file_name`
pub fn locate_source(folders: &[DatasetFolder], file_name: &str) -> Option<(usize, PathBuf)> {
    folders
        .iter()
        .enumerate()
        .find(|(_, folder)| folder.contains_file(file_name))
        .map(|(index, folder)| (index, folder.path.join(file_name)))
}
