//! Local disk storage for item images

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// URL prefix the upload directory is served under
pub const PUBLIC_PREFIX: &str = "/uploads/items";

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// `<uuid><ext>`
    pub stored_name: String,
    pub path: PathBuf,
    pub url: String,
    pub size: i64,
}

/// Writes uploaded images under one directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save bytes as `<uuid><original extension>`, creating the directory
    /// on first use.
    pub async fn save(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<StoredFile> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stored_name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let path = self.dir.join(&stored_name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored upload");
        Ok(StoredFile {
            url: format!("{PUBLIC_PREFIX}/{stored_name}"),
            stored_name,
            path,
            size: bytes.len() as i64,
        })
    }

    /// Delete a stored file. Paths outside the upload directory are left
    /// alone; failures are logged, not returned.
    pub async fn remove(&self, path: &Path) {
        if !path.starts_with(&self.dir) {
            tracing::warn!(path = %path.display(), "refusing to remove file outside upload dir");
            return;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed upload"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove upload"),
        }
    }
}

/// `.ext` of the client file name, or empty.
fn extension_of(name: Option<&str>) -> String {
    name.map(Path::new)
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
