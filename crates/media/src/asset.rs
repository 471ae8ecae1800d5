//! Downloaded files held in temporary storage.
//!
//! A [`FetchedAsset`] owns its backing temp file or temp directory. Calling
//! [`FetchedAsset::release`] removes it and logs failures. If the asset is
//! dropped instead (early return, error, panic), `tempfile` removes it on
//! drop. Either way the storage goes away exactly once.

use std::path::{Path, PathBuf};

use {
    tempfile::{NamedTempFile, TempDir, TempPath},
    tracing::{debug, warn},
};

use crate::kind::mime_for_extension;

/// Prefix of every file and directory the pipeline creates.
pub const TEMP_PREFIX: &str = "pinsaver_";

/// Where temporary files are created.
#[derive(Debug, Clone, Default)]
pub struct TempRoot {
    dir: Option<PathBuf>,
}

impl TempRoot {
    /// `None` means the system temp directory.
    #[must_use]
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// A fresh, uniquely named file ending in `.{extension}`. Created on the
    /// blocking pool.
    pub async fn file(&self, extension: &str) -> std::io::Result<NamedTempFile> {
        let dir = self.dir.clone();
        let suffix = format!(".{extension}");
        blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(TEMP_PREFIX).suffix(&suffix);
            match &dir {
                Some(dir) => builder.tempfile_in(dir),
                None => builder.tempfile(),
            }
        })
        .await
    }

    /// A fresh, uniquely named empty directory. Created on the blocking pool.
    pub async fn dir(&self) -> std::io::Result<TempDir> {
        let dir = self.dir.clone();
        blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(TEMP_PREFIX);
            match &dir {
                Some(dir) => builder.tempdir_in(dir),
                None => builder.tempdir(),
            }
        })
        .await
    }
}

async fn blocking<T, F>(f: F) -> std::io::Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(std::io::Error::other)?
}

#[derive(Debug)]
enum Backing {
    File(TempPath),
    Dir(TempDir),
}

/// A local file ready for delivery.
#[derive(Debug)]
pub struct FetchedAsset {
    path: PathBuf,
    backing: Backing,
    extension: String,
    content_type: Option<String>,
    size: u64,
}

impl FetchedAsset {
    /// Take ownership of a single temp file.
    #[must_use]
    pub fn from_temp_path(
        path: TempPath,
        extension: impl Into<String>,
        content_type: Option<String>,
        size: u64,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            backing: Backing::File(path),
            extension: extension.into(),
            content_type,
            size,
        }
    }

    /// Take ownership of a temp directory; `file` must live inside it.
    /// Extension and content type come from the file name.
    #[must_use]
    pub fn from_temp_dir(dir: TempDir, file: PathBuf, size: u64) -> Self {
        let extension = file
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content_type = mime_for_extension(&extension).map(str::to_string);
        Self {
            path: file,
            backing: Backing::Dir(dir),
            extension,
            content_type,
            size,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension without the dot; may be empty.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Delete the file and its temp directory. Never fails; problems are logged.
    pub async fn release(self) {
        let Self { path, backing, .. } = self;
        let result = tokio::task::spawn_blocking(move || match backing {
            Backing::File(temp_path) => temp_path.close(),
            Backing::Dir(dir) => dir.close(),
        })
        .await;
        match result {
            Ok(Ok(())) => debug!(path = %path.display(), "temporary media removed"),
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "failed to remove temporary media"),
            Err(e) => warn!(path = %path.display(), error = %e, "temporary media cleanup task failed"),
        }
    }
}
