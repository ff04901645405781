use spendsort_core::CategoryMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to replace category file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Why a persisted category file could not be used. Never fatal: see
/// [`CategoryStore::load`].
#[derive(Debug, Error)]
pub enum StoreLoadError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Malformed category file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// File-backed category dictionary. Every successful mutation is written to
/// disk before it becomes visible in memory.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    path: PathBuf,
    categories: CategoryMap,
}

impl CategoryStore {
    /// Loads the dictionary at `path`. A missing, unreadable or malformed file
    /// yields the default store holding only `Uncategorized`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("{e}; starting with default categories");
                Self::with_categories(path, CategoryMap::default())
            }
        }
    }

    /// Like [`CategoryStore::load`] but reports why an existing file was
    /// rejected. A missing file is still not an error.
    pub fn try_load(path: &Path) -> Result<Self, StoreLoadError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No category file at {}, using defaults", path.display());
                return Ok(Self::with_categories(path, CategoryMap::default()));
            }
            Err(source) => {
                return Err(StoreLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let categories =
            serde_json::from_str(&content).map_err(|source| StoreLoadError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::with_categories(path, categories))
    }

    pub fn with_categories(path: impl Into<PathBuf>, categories: CategoryMap) -> Self {
        Self {
            path: path.into(),
            categories,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.names()
    }

    pub fn keywords(&self, name: &str) -> Option<&[String]> {
        self.categories.keywords(name)
    }

    /// Adds an empty category and persists. `Ok(false)` means the name was
    /// blank or already present and nothing changed.
    pub fn add_category(&mut self, name: &str) -> Result<bool, StoreError> {
        let mut next = self.categories.clone();
        if !next.insert_category(name) {
            return Ok(false);
        }
        self.commit(next)?;
        tracing::info!(category = name, "added category");
        Ok(true)
    }

    /// Adds a keyword and persists. `Ok(false)` means nothing changed: the
    /// keyword was blank or already known, or the category is unknown or
    /// reserved.
    pub fn add_keyword(&mut self, category: &str, keyword: &str) -> Result<bool, StoreError> {
        let mut next = self.categories.clone();
        if !next.insert_keyword(category, keyword) {
            return Ok(false);
        }
        self.commit(next)?;
        tracing::info!(category, keyword = keyword.trim(), "learned keyword");
        Ok(true)
    }

    pub fn save(&self) -> Result<(), StoreError> {
        write_atomically(&self.path, &self.categories)
    }

    fn commit(&mut self, next: CategoryMap) -> Result<(), StoreError> {
        write_atomically(&self.path, &next)?;
        self.categories = next;
        Ok(())
    }
}

/// Writes to a temp file beside `path`, syncs it, then renames it into place,
/// so an interrupted save leaves the previous file intact.
fn write_atomically(path: &Path, categories: &CategoryMap) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut bytes = serde_json::to_vec_pretty(categories)?;
    bytes.push(b'\n');

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
