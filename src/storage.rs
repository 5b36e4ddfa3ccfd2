use async_trait::async_trait;
use log::{error, info, warn};
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Id;

/// Public URL prefix under which stored photos are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum PhotoStoreError {
    #[error("not_found")]
    NotFound,
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub apartment_id: Id,
    pub file_name: String,
    /// Relative URL recorded in `photos.photo_url`.
    pub url: String,
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn save(&self, apartment_id: Id, file_name: &str, bytes: &[u8]) -> Result<StoredPhoto, PhotoStoreError>;
    async fn load(&self, apartment_id: Id, file_name: &str) -> Result<Vec<u8>, PhotoStoreError>;
    async fn delete(&self, apartment_id: Id, file_name: &str) -> Result<(), PhotoStoreError>;
}

/// Generated names only ever use this alphabet, so anything else is rejected
/// before it reaches the filesystem.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// Lower-cased extension of the client's file name, including the dot, or an
/// empty string when there is no usable extension.
fn sanitized_extension(original: Option<&str>) -> String {
    let Some(ext) = original.and_then(|n| Path::new(n).extension()).and_then(|e| e.to_str()) else {
        return String::new();
    };
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return String::new();
    }
    format!(".{}", ext.to_ascii_lowercase())
}

/// `<unix millis>-<random 0..1e9><.ext>`; the client's name only contributes
/// its extension.
pub fn generate_file_name(original: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{millis}-{suffix}{}", sanitized_extension(original))
}

pub fn photo_url(apartment_id: Id, file_name: &str) -> String {
    format!("{UPLOADS_URL_PREFIX}/{apartment_id}/{file_name}")
}

// ---------------- Filesystem implementation ----------------
pub struct FsPhotoStore {
    root: PathBuf,
}

impl FsPhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn apartment_dir(&self, apartment_id: Id) -> PathBuf {
        self.root.join(apartment_id.to_string())
    }

    fn path_for(&self, apartment_id: Id, file_name: &str) -> Result<PathBuf, PhotoStoreError> {
        if !is_valid_file_name(file_name) {
            return Err(PhotoStoreError::InvalidName(file_name.to_string()));
        }
        Ok(self.apartment_dir(apartment_id).join(file_name))
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn save(&self, apartment_id: Id, file_name: &str, bytes: &[u8]) -> Result<StoredPhoto, PhotoStoreError> {
        let path = self.path_for(apartment_id, file_name)?;
        tokio::fs::create_dir_all(self.apartment_dir(apartment_id)).await?;
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            error!("failed to write photo path={} err={e}", path.display());
            return Err(e.into());
        }
        info!("stored photo apartment={apartment_id} file={file_name} size={}", bytes.len());
        Ok(StoredPhoto {
            apartment_id,
            file_name: file_name.to_string(),
            url: photo_url(apartment_id, file_name),
        })
    }

    async fn load(&self, apartment_id: Id, file_name: &str) -> Result<Vec<u8>, PhotoStoreError> {
        let path = self.path_for(apartment_id, file_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PhotoStoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, apartment_id: Id, file_name: &str) -> Result<(), PhotoStoreError> {
        let path = self.path_for(apartment_id, file_name)?;
        // Best-effort delete: treat not found as success
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("failed to delete photo path={} err={e}", path.display());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_keep_only_a_clean_extension() {
        let name = generate_file_name(Some("Salon Photo.JPG"));
        assert!(name.ends_with(".jpg"), "{name}");
        assert!(is_valid_file_name(&name));

        let bare = generate_file_name(Some("../../etc/passwd"));
        assert!(!bare.contains('/'));
        assert!(is_valid_file_name(&bare));

        assert!(!generate_file_name(None).contains('.'));
    }

    #[test]
    fn generated_names_differ() {
        let a = generate_file_name(Some("a.png"));
        let b = generate_file_name(Some("a.png"));
        assert_ne!(a, b);
    }

    #[test]
    fn traversal_names_rejected() {
        for bad in ["", "..", "../x.png", "a/b.png", ".hidden", "a b.png"] {
            assert!(!is_valid_file_name(bad), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn save_load_delete_under_apartment_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsPhotoStore::new(tmp.path());

        let stored = store.save(9, "1700000000000-42.png", b"png-bytes").await.unwrap();
        assert_eq!(stored.url, "/uploads/9/1700000000000-42.png");
        assert!(tmp.path().join("9").join("1700000000000-42.png").is_file());

        assert_eq!(store.load(9, "1700000000000-42.png").await.unwrap(), b"png-bytes");
        store.delete(9, "1700000000000-42.png").await.unwrap();
        assert!(matches!(store.load(9, "1700000000000-42.png").await, Err(PhotoStoreError::NotFound)));
        // deleting twice is fine
        store.delete(9, "1700000000000-42.png").await.unwrap();
    }
}
