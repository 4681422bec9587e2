//! Upload directory management.
//!
//! Gallery images live under `{root}/galleries/{album_id}/{uuid}.{ext}`.
//! Deletion is best effort: a missing or locked file is logged, never
//! surfaced to the request.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use shared::validation::{extension_allowed, file_extension};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File type .{0} is not allowed")]
    ExtensionNotAllowed(String),

    #[error("File exceeds the {0} byte upload limit")]
    TooLarge(usize),

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Invalid file path")]
    InvalidPath,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written to the upload directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct Storage {
    config: Arc<StorageConfig>,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn root(&self) -> &Path {
        Path::new(&self.config.root)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    fn album_dir(&self, album_id: i64) -> PathBuf {
        self.root().join("galleries").join(album_id.to_string())
    }

    pub fn album_file_url(&self, album_id: i64, filename: &str) -> String {
        format!(
            "{}/galleries/{}/{}",
            self.config.public_url_prefix.trim_end_matches('/'),
            album_id,
            filename
        )
    }

    /// Validates name and size of an upload before anything touches disk.
    pub fn check_upload(&self, original_name: &str, size: usize) -> Result<String, StorageError> {
        if !extension_allowed(original_name, &self.config.allowed_image_extensions) {
            let ext = file_extension(original_name).unwrap_or_default();
            return Err(StorageError::ExtensionNotAllowed(ext));
        }
        if size == 0 {
            return Err(StorageError::EmptyFile);
        }
        if size > self.config.max_upload_bytes {
            return Err(StorageError::TooLarge(self.config.max_upload_bytes));
        }
        file_extension(original_name).ok_or(StorageError::InvalidPath)
    }

    /// Writes an upload into the album directory under a fresh unique name.
    pub async fn save_album_image(
        &self,
        album_id: i64,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let ext = self.check_upload(original_name, bytes.len())?;
        let dir = self.album_dir(album_id);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
        tokio::fs::write(dir.join(&filename), bytes).await?;
        debug!(album_id, filename = %filename, size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            mime_type: mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            original_name: sanitize_original_name(original_name),
            size: bytes.len() as i64,
            filename,
        })
    }

    /// Removes one album image. Failures are logged and swallowed.
    pub async fn delete_album_image(&self, album_id: i64, filename: &str) {
        let Some(name) = single_component(filename) else {
            warn!(album_id, filename, "Refusing to delete suspicious file name");
            return;
        };
        let path = self.album_dir(album_id).join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to delete upload");
            }
        }
    }

    /// Removes the given files and then the album directory, best effort.
    pub async fn delete_album_dir(&self, album_id: i64, filenames: &[String]) {
        for filename in filenames {
            self.delete_album_image(album_id, filename).await;
        }
        let dir = self.album_dir(album_id);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %dir.display(), error = %e, "Failed to remove album directory");
            }
        }
    }

    /// Reads a public file for `/uploads/*path`, with its content type.
    pub async fn open(&self, relative: &str) -> Result<(Vec<u8>, String), StorageError> {
        let relative = safe_relative_path(relative).ok_or(StorageError::InvalidPath)?;
        let path = self.root().join(&relative);
        let bytes = tokio::fs::read(&path).await?;
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Ok((bytes, mime.essence_str().to_string()))
    }
}

fn single_component(name: &str) -> Option<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(name),
        _ => None,
    }
}

/// Only plain, non-hidden components; `..`, absolute paths and dotfiles are rejected.
fn safe_relative_path(relative: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => {
                let part_str = part.to_str()?;
                if part_str.starts_with('.') {
                    return None;
                }
                path.push(part);
            }
            _ => return None,
        }
    }
    (!path.as_os_str().is_empty()).then_some(path)
}

/// Keeps the file name part and drops control characters.
fn sanitize_original_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars().filter(|c| !c.is_control()).take(255).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &Path) -> Storage {
        Storage::new(StorageConfig {
            root: root.to_string_lossy().into_owned(),
            max_upload_bytes: 16,
            ..Default::default()
        })
    }

    #[test]
    fn test_check_upload_whitelist() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        assert_eq!(storage.check_upload("cat.PNG", 4).unwrap(), "png");
        assert!(matches!(
            storage.check_upload("shell.php", 4),
            Err(StorageError::ExtensionNotAllowed(ext)) if ext == "php"
        ));
        assert!(matches!(storage.check_upload("cat.png", 0), Err(StorageError::EmptyFile)));
        assert!(matches!(storage.check_upload("cat.png", 17), Err(StorageError::TooLarge(16))));
    }

    #[tokio::test]
    async fn test_save_and_delete_album_image() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let stored = storage.save_album_image(7, "C:\\photos\\beach.jpg", b"jpegdata").await.unwrap();
        assert!(stored.filename.ends_with(".jpg"));
        assert_eq!(stored.original_name, "beach.jpg");
        assert_eq!(stored.mime_type, "image/jpeg");
        assert_eq!(stored.size, 8);

        let path = dir.path().join("galleries/7").join(&stored.filename);
        assert!(path.exists());

        storage.delete_album_image(7, &stored.filename).await;
        assert!(!path.exists());
        // second delete is a silent no-op
        storage.delete_album_image(7, &stored.filename).await;
    }

    #[tokio::test]
    async fn test_unique_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let a = storage.save_album_image(1, "a.png", b"x").await.unwrap();
        let b = storage.save_album_image(1, "a.png", b"x").await.unwrap();
        assert_ne!(a.filename, b.filename);
    }

    #[tokio::test]
    async fn test_delete_album_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let stored = storage.save_album_image(3, "a.gif", b"gif").await.unwrap();
        storage.delete_album_dir(3, &[stored.filename, "missing.png".into()]).await;
        assert!(!dir.path().join("galleries/3").exists());
        storage.delete_album_dir(3, &[]).await;
    }

    #[tokio::test]
    async fn test_open_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let stored = storage.save_album_image(2, "a.webp", b"webp").await.unwrap();

        let (bytes, mime) = storage
            .open(&format!("galleries/2/{}", stored.filename))
            .await
            .unwrap();
        assert_eq!(bytes, b"webp");
        assert_eq!(mime, "image/webp");

        for bad in ["../etc/passwd", "galleries/../../x", "/", "", ".env", "galleries/.hidden"] {
            assert!(matches!(storage.open(bad).await, Err(StorageError::InvalidPath)), "{}", bad);
        }
    }

    #[test]
    fn test_album_file_url() {
        let storage = Storage::new(StorageConfig {
            public_url_prefix: "/uploads/".into(),
            ..Default::default()
        });
        assert_eq!(storage.album_file_url(4, "x.png"), "/uploads/galleries/4/x.png");
    }

    #[test]
    fn test_single_component() {
        assert_eq!(single_component("a.png"), Some("a.png"));
        assert_eq!(single_component("../a.png"), None);
        assert_eq!(single_component("dir/a.png"), None);
    }
}
