//! Output file replacement.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Replace `path` with `contents` unless it already holds exactly that.
///
/// The new content is written to a sibling temp file and renamed into place,
/// so readers see either the old or the new file, never a partial one.
/// Returns whether the file changed.
pub fn write_if_changed(path: &Path, contents: &str) -> io::Result<bool> {
    if let Ok(existing) = fs::read(path) {
        if existing == contents.as_bytes() {
            return Ok(false);
        }
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".consuldog-")
        .tempfile_in(dir)?;
    staged.write_all(contents.as_bytes())?;
    staged.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o644))?;
    }

    staged.persist(path).map_err(|e| e.error)?;
    Ok(true)
}
