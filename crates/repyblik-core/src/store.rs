//! Key-value persisted state.
//!
//! Tokens and the sync checkpoint are small strings stored one per key. The
//! core only talks to the `StateStore` trait; `FileStore` maps keys to files
//! in a directory and `MemoryStore` keeps them in memory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

/// Suffix of the temporary file used for atomic writes
const TEMP_SUFFIX: &str = "tmp";

pub trait StateStore {
    /// Read the value stored under `key`, `None` if nothing is stored
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the value stored under `key`
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        (**self).write(key, value)
    }
}

/// One file per key below a root directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file backing `key`. Keys must be a single path component.
    pub fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let invalid = key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\'])
            || key.contains('\0');
        if invalid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid state key: {:?}", key),
            ));
        }
        Ok(self.root.join(key))
    }
}

impl StateStore for FileStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        atomic_write(&path, value.as_bytes())?;
        debug!(path = %path.display(), "State written");
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over the target.
/// Readers see either the old content or the new content, never a mix.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".");
    temp_name.push(TEMP_SUFFIX);
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, data)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// In-memory store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.insert(key, value);
        store
    }

    fn insert(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.insert(key, value);
        Ok(())
    }
}
