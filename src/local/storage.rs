//! Local filesystem storage for rateio and invoice attachments.
//!
//! Files are grouped by owner so a record's documents sit together:
//! ```text
//! .rateio/attachments/{kind}/{owner_id}/{content_hash}.{ext}
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// What an attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Rateio,
    Invoice,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Rateio => "rateio",
            AttachmentKind::Invoice => "invoice",
        }
    }
}

/// Content-addressed attachment storage organized by owner.
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    /// Create a new store at the given directory.
    pub async fn new(root: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&root)
            .await
            .context("Failed to create attachments directory")?;

        Ok(Self { root })
    }

    /// Store an attachment, returns the storage key.
    ///
    /// `file_name` only contributes its extension.
    pub async fn put(
        &self,
        kind: AttachmentKind,
        owner: Uuid,
        file_name: &str,
        content: &[u8],
    ) -> Result<String> {
        let hash = hex::encode(Sha256::digest(content));
        let name = match extension_of(file_name) {
            Some(ext) => format!("{}.{}", hash, ext),
            None => hash,
        };
        let key = format!("{}/{}/{}", kind.as_str(), owner, name);
        let path = self.root.join(&key);

        if !path.exists() {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
        }

        Ok(key)
    }

    /// Copy a file from disk into the store.
    pub async fn put_file(&self, kind: AttachmentKind, owner: Uuid, source: &Path) -> Result<String> {
        let content = tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read attachment {}", source.display()))?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.put(kind, owner, &file_name, &content).await
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.path_of(key).exists()
    }

    /// Absolute path of a stored attachment.
    pub fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Delete every attachment of one record.
    pub async fn delete_owner(&self, kind: AttachmentKind, owner: Uuid) -> Result<()> {
        let path = self.root.join(kind.as_str()).join(owner.to_string());
        if path.exists() {
            tokio::fs::remove_dir_all(&path).await?;
        }
        Ok(())
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path().join("attachments")).await.unwrap();
        let owner = Uuid::new_v4();

        let content = b"%PDF-1.4 conta de luz";
        let key = store
            .put(AttachmentKind::Invoice, owner, "fatura-marco.PDF", content)
            .await
            .unwrap();

        assert!(key.starts_with(&format!("invoice/{}/", owner)));
        assert!(key.ends_with(".pdf"));
        assert!(store.exists(&key).await);
        assert_eq!(std::fs::read(store.path_of(&key)).unwrap(), content);
    }

    #[tokio::test]
    async fn test_content_addressed_within_owner() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path().join("attachments")).await.unwrap();
        let owner = Uuid::new_v4();

        let key1 = store.put(AttachmentKind::Rateio, owner, "a.xlsx", b"same").await.unwrap();
        let key2 = store.put(AttachmentKind::Rateio, owner, "b.xlsx", b"same").await.unwrap();
        assert_eq!(key1, key2);
    }

    #[tokio::test]
    async fn test_put_file() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path().join("attachments")).await.unwrap();
        let source = dir.path().join("planilha.csv");
        std::fs::write(&source, "uc;kwh\n").unwrap();

        let key = store
            .put_file(AttachmentKind::Rateio, Uuid::new_v4(), &source)
            .await
            .unwrap();
        assert!(key.ends_with(".csv"));

        let missing = store
            .put_file(AttachmentKind::Rateio, Uuid::new_v4(), &dir.path().join("nope.csv"))
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_delete_owner() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path().join("attachments")).await.unwrap();
        let owner = Uuid::new_v4();

        let key1 = store.put(AttachmentKind::Invoice, owner, "x", b"one").await.unwrap();
        let key2 = store.put(AttachmentKind::Invoice, owner, "y", b"two").await.unwrap();

        store.delete_owner(AttachmentKind::Invoice, owner).await.unwrap();

        assert!(!store.exists(&key1).await);
        assert!(!store.exists(&key2).await);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("conta.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("sem_extensao"), None);
        assert_eq!(extension_of("odd.p d f"), None);
    }
}
