//! File copy with metadata preservation.
//!
//! Content is written to a hidden temporary sibling and renamed over the
//! destination only after content, permissions and timestamps are in place,
//! so an interrupted copy never leaves a truncated file at the final path.

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;

const TEMP_PREFIX: &str = ".backup-";
const TEMP_SUFFIX: &str = ".partial";

/// Copy `src` to `dst` atomically and return the number of bytes copied.
///
/// The parent directory of `dst` must already exist.
pub fn copy_file_atomic(src: &Path, dst: &Path) -> io::Result<u64> {
    let parent = dst.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("destination has no parent directory: {}", dst.display()),
        )
    })?;

    let mut src_file = fs::File::open(src)?;
    let src_meta = src_file.metadata()?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;

    let bytes = io::copy(&mut src_file, temp.as_file_mut())?;
    temp.as_file().sync_all()?;

    fs::set_permissions(temp.path(), src_meta.permissions())?;
    filetime::set_file_times(
        temp.path(),
        FileTime::from_last_access_time(&src_meta),
        FileTime::from_last_modification_time(&src_meta),
    )?;

    temp.persist(dst).map_err(|e| e.error)?;

    Ok(bytes)
}

/// Create `path` and any missing parents. Fails when something other than a
/// directory already sits at `path`.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("path exists but is not a directory: {}", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(path),
        Err(e) => Err(e),
    }
}
