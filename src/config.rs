//! Where notes live on disk.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use crate::store::FileNoteStore;

/// Environment variable overriding the storage root.
pub const DATA_DIR_ENV: &str = "CHAPPY_NOTES_DIR";

/// Runtime configuration of the notes backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesConfig {
    /// Storage root holding the index, markdown, `raw/` and `figures/`.
    pub data_dir: PathBuf,
}

impl NotesConfig {
    /// Resolves the storage root.
    ///
    /// Priority: `data_dir` (the CLI flag), then `CHAPPY_NOTES_DIR`, then
    /// `{data_dir}/chappy-notes/notes` where `data_dir` is:
    /// - Linux: `~/.local/share`
    /// - macOS: `~/Library/Application Support`
    /// - Windows: `C:\Users\<user>\AppData\Roaming`
    ///
    /// # Examples
    ///
    /// ```
    /// use chappy_notes::config::NotesConfig;
    /// use std::path::PathBuf;
    ///
    /// let config = NotesConfig::resolve(Some(PathBuf::from("/tmp/notes"))).unwrap();
    /// assert_eq!(config.data_dir, PathBuf::from("/tmp/notes"));
    /// ```
    pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self> {
        match data_dir {
            Some(data_dir) => Ok(Self { data_dir }),
            None => Self::from_env(),
        }
    }

    /// Resolves the storage root from the environment, falling back to the platform default.
    pub fn from_env() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        Ok(Self { data_dir })
    }

    /// Opens the store at `data_dir`, creating its layout if needed.
    pub fn open_store(&self) -> Result<FileNoteStore> {
        FileNoteStore::open(&self.data_dir).with_context(|| {
            format!("Failed to open note store at {}", self.data_dir.display())
        })
    }
}

/// Platform default storage root.
pub fn default_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("Failed to determine data directory"))?;
    Ok(data_dir.join("chappy-notes").join("notes"))
}
