//! Object storage for uploaded notes and question papers
//!
//! Objects are addressed by bucket and a relative path. The local store keeps
//! them under `<root>/<bucket>/<path>`.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Trait for object storage backends
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a new object; an existing object at the same path is an error
    async fn put(&self, bucket: &str, path: &str, data: Bytes) -> Result<()>;

    /// Fetch an object, `None` if absent
    async fn get(&self, bucket: &str, path: &str) -> Result<Option<Bytes>>;

    /// Remove an object, returning whether it existed
    async fn remove(&self, bucket: &str, path: &str) -> Result<bool>;

    /// URL clients use to fetch the object
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Content type served for a stored object, by extension
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",
        _ => "application/octet-stream",
    }
}

/// Filesystem-backed object store
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolve `bucket/path` under the root, refusing anything that escapes it
    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(path);
        let mut clean = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => clean.push(part),
                _ => {
                    return Err(AppError::InvalidFormat {
                        message: format!("Invalid object path: {}/{}", bucket, path),
                    })
                }
            }
        }
        if bucket.is_empty() || path.is_empty() || clean.components().count() < 2 {
            return Err(AppError::InvalidFormat {
                message: format!("Invalid object path: {}/{}", bucket, path),
            });
        }
        Ok(self.root.join(clean))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bucket: &str, path: &str, data: Bytes) -> Result<()> {
        let target = self.resolve(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => AppError::Duplicate {
                    message: format!("Object already exists: {}/{}", bucket, path),
                },
                _ => e.into(),
            })?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!(bucket, path, bytes = data.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, bucket: &str, path: &str) -> Result<Option<Bytes>> {
        let target = self.resolve(bucket, path)?;
        match tokio::fs::read(&target).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<bool> {
        let target = self.resolve(bucket, path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (LocalObjectStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("bracu-loop-store-{}", uuid::Uuid::new_v4()));
        (LocalObjectStore::new(&root, "/v1/objects/"), root)
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let (store, root) = store();

        store
            .put("student-notes", "CSE110/1_notes.zip", Bytes::from_static(b"PK"))
            .await
            .unwrap();
        let data = store.get("student-notes", "CSE110/1_notes.zip").await.unwrap();
        assert_eq!(data, Some(Bytes::from_static(b"PK")));

        assert!(store.remove("student-notes", "CSE110/1_notes.zip").await.unwrap());
        assert!(!store.remove("student-notes", "CSE110/1_notes.zip").await.unwrap());
        assert_eq!(store.get("student-notes", "CSE110/1_notes.zip").await.unwrap(), None);

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_put_refuses_overwrite() {
        let (store, root) = store();

        store.put("b", "x.pdf", Bytes::from_static(b"1")).await.unwrap();
        let err = store.put("b", "x.pdf", Bytes::from_static(b"2")).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));

        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[test]
    fn test_rejects_path_traversal() {
        let (store, _root) = store();
        tokio_test::block_on(async {
            assert!(store.get("b", "../../etc/passwd").await.is_err());
            assert!(store.get("b", "/etc/passwd").await.is_err());
            assert!(store.get("", "x").await.is_err());
        });
    }

    #[test]
    fn test_public_url() {
        let (store, _root) = store();
        assert_eq!(
            store.public_url("question-papers", "CSE110/2024/Spring/a.pdf"),
            "/v1/objects/question-papers/CSE110/2024/Spring/a.pdf"
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a/b.PDF"), "application/pdf");
        assert_eq!(content_type_for("x.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
