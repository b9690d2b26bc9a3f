//! File Storage
//!
//! Save/retrieve/delete by logical path plus public-URL resolution. The
//! storefront only streams purchased files out of here; upload pipelines
//! live elsewhere.

use async_trait::async_trait;
use shared::error::{AppError, AppResult, ErrorCode};
use std::path::{Component, Path, PathBuf};

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save(&self, path: &str, bytes: &[u8]) -> AppResult<()>;
    async fn retrieve(&self, path: &str) -> AppResult<Vec<u8>>;
    async fn delete(&self, path: &str) -> AppResult<()>;
    /// Public URL for a stored path
    fn url_for(&self, path: &str) -> String;
}

/// Local-disk storage rooted at `work_dir/files`
pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Resolve a logical path under the root, rejecting traversal
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path);
        let traversal = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if path.is_empty() || traversal {
            return Err(AppError::with_message(
                ErrorCode::FileStorageFailed,
                format!("Illegal storage path: {path}"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, path: &str, bytes: &[u8]) -> AppResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_message(
                    ErrorCode::FileStorageFailed,
                    format!("Failed to create storage directory: {e}"),
                )
            })?;
        }
        tokio::fs::write(&full, bytes).await.map_err(|e| {
            AppError::with_message(ErrorCode::FileStorageFailed, format!("Failed to save file: {e}"))
        })
    }

    async fn retrieve(&self, path: &str) -> AppResult<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::with_message(ErrorCode::DigitalFileMissing, format!("File missing: {path}"))
            }
            _ => AppError::with_message(
                ErrorCode::FileStorageFailed,
                format!("Failed to read file: {e}"),
            ),
        })
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            // Deleting an absent file is a no-op
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_message(
                ErrorCode::FileStorageFailed,
                format!("Failed to delete file: {e}"),
            )),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/files/{}", self.public_base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_retrieve_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path(), "http://localhost:3000");

        storage.save("books/guide.pdf", b"pdf bytes").await.unwrap();
        let bytes = storage.retrieve("books/guide.pdf").await.unwrap();
        assert_eq!(bytes, b"pdf bytes");

        storage.delete("books/guide.pdf").await.unwrap();
        let err = storage.retrieve("books/guide.pdf").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DigitalFileMissing);

        // Deleting twice is fine
        storage.delete("books/guide.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path(), "http://localhost:3000");
        assert!(storage.retrieve("../etc/passwd").await.is_err());
        assert!(storage.save("/abs/path", b"x").await.is_err());
        assert!(storage.retrieve("").await.is_err());
    }

    #[test]
    fn test_url_for() {
        let storage = LocalFileStorage::new("/tmp/files", "https://store.example.com");
        assert_eq!(
            storage.url_for("books/guide.pdf"),
            "https://store.example.com/files/books/guide.pdf"
        );
    }
}
