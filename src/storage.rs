//! Disk-backed object store for chat attachments and agent avatars.
//!
//! Files land under `<uploads_dir>/<user>/<uuid>.<ext>` and are served
//! publicly at `<public_base_url>/uploads/<user>/<uuid>.<ext>`.

use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Path relative to the uploads root, also the public URL suffix.
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    public_base_url: String,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: String) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub async fn upload(
        &self,
        owner_id: Uuid,
        original_filename: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError> {
        let relative = format!(
            "{}/{}{}",
            owner_id,
            Uuid::new_v4(),
            safe_extension(original_filename)
        );
        let full_path = self.root.join(&relative);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, bytes).await?;

        Ok(StoredObject {
            path: relative,
            size: bytes.len() as u64,
        })
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, path)
    }
}

/// Lowercased extension of the original name, dot included, restricted to
/// short alphanumeric suffixes so a hostile filename cannot shape the path.
fn safe_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(safe_extension("photo.PNG"), ".png");
        assert_eq!(safe_extension("contrato.pdf"), ".pdf");
        assert_eq!(safe_extension("no-extension"), "");
        assert_eq!(safe_extension("weird.../../../etc"), "");
        assert_eq!(safe_extension("archive.tar.gz"), ".gz");
    }

    #[test]
    fn public_url_joins_base_and_path() {
        let store = AttachmentStore::new("/tmp/uploads", "http://localhost:3000".to_string());
        assert_eq!(
            store.public_url("abc/def.png"),
            "http://localhost:3000/uploads/abc/def.png"
        );
    }

    #[tokio::test]
    async fn upload_writes_bytes_under_owner_dir() {
        let dir = std::env::temp_dir().join(format!("inspetor-store-{}", Uuid::new_v4()));
        let store = AttachmentStore::new(&dir, "http://localhost:3000".to_string());
        let owner = Uuid::new_v4();

        let stored = store.upload(owner, "nota.pdf", b"conteudo").await.unwrap();
        assert!(stored.path.starts_with(&owner.to_string()));
        assert!(stored.path.ends_with(".pdf"));
        assert_eq!(stored.size, 8);

        let on_disk = tokio::fs::read(dir.join(&stored.path)).await.unwrap();
        assert_eq!(on_disk, b"conteudo");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
