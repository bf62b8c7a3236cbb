//! The pattern file on disk.
//!
//! The store is the only component that touches the file. Writes go through
//! a uniquely named temporary file in the same directory and a rename, so the
//! player never sees a half written pattern. The previous generation is kept
//! as `<file>.bak`.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use crate::dialect;
use crate::error::Error;
use crate::pattern::Pattern;
use crate::schema;

#[derive(Debug, Clone)]
pub struct PatternStore {
    path: PathBuf,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl PatternStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the previous generation is kept after a write.
    pub fn backup_path(&self) -> PathBuf {
        sibling(&self.path, ".bak")
    }

    fn write_error(path: &Path, source: io::Error) -> Error {
        Error::StorePermission {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Read the raw pattern text.
    pub async fn read(&self) -> Result<String, Error> {
        fs::read_to_string(&self.path).await.map_err(|source| {
            let path = self.path.clone();
            match source.kind() {
                io::ErrorKind::PermissionDenied => Error::StorePermission { path, source },
                _ => Error::StoreUnavailable { path, source },
            }
        })
    }

    /// Replace the pattern text: back up the current file, write a temporary
    /// sibling, then rename it into place.
    pub async fn write(&self, content: &str) -> Result<(), Error> {
        let backup = self.backup_path();
        match fs::copy(&self.path, &backup).await {
            Ok(_) => debug!("backed up {} to {}", self.path.display(), backup.display()),
            // Nothing to back up on the first write
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(Self::write_error(&backup, err)),
        }

        let target = self.path.clone();
        let content = content.to_owned();
        tokio::task::spawn_blocking(move || Self::replace_with(&target, &content))
            .await
            .map_err(|err| Self::write_error(&self.path, io::Error::other(err)))?
    }

    /// Each write gets its own temporary file next to `target`, so concurrent
    /// writers never rename each other's file away.
    fn replace_with(target: &Path, content: &str) -> Result<(), Error> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|err| Self::write_error(dir, err))?;
        temp.write_all(content.as_bytes())
            .map_err(|err| Self::write_error(temp.path(), err))?;
        temp.persist(target)
            .map_err(|err| Self::write_error(target, err.error))?;
        Ok(())
    }

    /// Read, parse and validate the current pattern.
    pub async fn load(&self) -> Result<Pattern, Error> {
        let raw = self.read().await?;
        let record = dialect::parse(&raw)?;
        Ok(schema::validate(&record)?)
    }

    /// Render `pattern` with a fresh timestamp and write it.
    pub async fn save(&self, pattern: &Pattern, description: &str) -> Result<(), Error> {
        self.write(&dialect::render(pattern, description)).await
    }
}
