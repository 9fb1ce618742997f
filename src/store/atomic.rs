use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{NotesError, Result};

/// Replaces `target` with `data` so that readers only ever see the old or the new file.
///
/// The bytes go to a temporary sibling first and are renamed over the target.
/// On failure the temporary file is removed and the target is left untouched.
pub(crate) fn write_file_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| NotesError::io(dir, e))?;

    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| NotesError::io(dir, e))?;

    temp.write_all(data)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| NotesError::io(temp.path(), e))?;

    temp.persist(target).map_err(|e| {
        log::error!("failed to replace {}: {}", target.display(), e.error);
        NotesError::io(target, e.error)
    })?;

    log::debug!("wrote {} ({} bytes)", target.display(), data.len());
    Ok(())
}
