//! # Upload Storage
//!
//! Saves listing images and payment slips under the uploads directory.
//!
//! ```text
//! <uploads_dir>/
//! ├── rabbits/3f2a9c…e1.webp
//! ├── products/8b41d0…77.png
//! └── slips/c09e5f…2a.jpg
//! ```
//!
//! The database stores the path relative to the uploads directory
//! (`rabbits/3f2a9c…e1.webp`); clients fetch it from `/uploads/<path>`.
//!
//! Only PNG, JPEG and WebP are accepted, and the leading bytes must agree
//! with the declared content type.

use axum::body::Bytes;
use axum::extract::multipart::Field;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ErrorCode};

/// What an upload belongs to; decides its subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Rabbit,
    Product,
    Slip,
}

impl UploadKind {
    pub fn dir(self) -> &'static str {
        match self {
            UploadKind::Rabbit => "rabbits",
            UploadKind::Product => "products",
            UploadKind::Slip => "slips",
        }
    }
}

/// A file received in a multipart field.
#[derive(Debug, Clone)]
pub struct Upload {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// Buffers a multipart field.
    pub async fn from_field(field: Field<'_>) -> ApiResult<Self> {
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        Ok(Upload {
            content_type,
            bytes,
        })
    }
}

/// Detects the file extension, requiring the magic bytes to match the
/// declared type.
pub fn image_extension(content_type: Option<&str>, bytes: &[u8]) -> ApiResult<&'static str> {
    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let (ext, matches) = match declared.as_str() {
        "image/png" => ("png", bytes.starts_with(b"\x89PNG\r\n\x1a\n")),
        "image/jpeg" | "image/jpg" => ("jpg", bytes.starts_with(&[0xFF, 0xD8, 0xFF])),
        "image/webp" => (
            "webp",
            bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        ),
        _ => {
            return Err(ApiError::new(
                ErrorCode::UnsupportedMediaType,
                "Only PNG, JPEG and WebP images are accepted",
            ))
        }
    };

    if !matches {
        return Err(ApiError::new(
            ErrorCode::UnsupportedMediaType,
            format!("File content is not a valid {}", declared),
        ));
    }

    Ok(ext)
}

/// Writes and removes files under the uploads root.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        UploadStore {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validates and stores an upload.
    ///
    /// ## Returns
    /// The stored path relative to the uploads root, e.g. `slips/<uuid>.png`.
    pub async fn save(&self, kind: UploadKind, upload: &Upload) -> ApiResult<String> {
        if upload.bytes.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(ApiError::new(
                ErrorCode::PayloadTooLarge,
                format!("File exceeds the {} byte limit", self.max_bytes),
            ));
        }

        let ext = image_extension(upload.content_type.as_deref(), &upload.bytes)?;
        let relative = format!("{}/{}.{}", kind.dir(), Uuid::new_v4().simple(), ext);

        tokio::fs::create_dir_all(self.root.join(kind.dir())).await?;
        tokio::fs::write(self.root.join(&relative), &upload.bytes).await?;

        info!(path = %relative, size = upload.bytes.len(), "Stored upload");
        Ok(relative)
    }

    /// Deletes a stored file. Failures are logged, never returned: a stale
    /// file is preferable to failing the request that replaced it.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!(path = %relative, "Refusing to remove path outside uploads");
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %relative, "Removed upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %relative, error = %e, "Failed to remove upload"),
        }
    }

    /// Joins a stored relative path onto the root, rejecting anything that
    /// could escape it.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative);
        let contained = !relative.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        contained.then(|| self.root.join(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    const WEBP: &[u8] = b"RIFF\x24\0\0\0WEBPVP8 ";

    fn upload(content_type: &str, bytes: &'static [u8]) -> Upload {
        Upload {
            content_type: Some(content_type.to_string()),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Some("image/png"), PNG).unwrap(), "png");
        assert_eq!(image_extension(Some("IMAGE/JPEG"), JPEG).unwrap(), "jpg");
        assert_eq!(
            image_extension(Some("image/webp; charset=binary"), WEBP).unwrap(),
            "webp"
        );
    }

    #[test]
    fn test_image_extension_rejects_other_types() {
        let gif = image_extension(Some("image/gif"), b"GIF89a").unwrap_err();
        assert_eq!(gif.code, ErrorCode::UnsupportedMediaType);

        assert!(image_extension(None, PNG).is_err());

        // Declared PNG, actually a script
        let spoofed = image_extension(Some("image/png"), b"#!/bin/sh").unwrap_err();
        assert_eq!(spoofed.code, ErrorCode::UnsupportedMediaType);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(tmp.path(), 1024);

        let path = store
            .save(UploadKind::Slip, &upload("image/png", PNG))
            .await
            .unwrap();
        assert!(path.starts_with("slips/"));
        assert!(path.ends_with(".png"));
        assert_eq!(std::fs::read(tmp.path().join(&path)).unwrap(), PNG);

        store.remove(&path).await;
        assert!(!tmp.path().join(&path).exists());
        // Second removal is a no-op
        store.remove(&path).await;
    }

    #[tokio::test]
    async fn test_save_enforces_size_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(tmp.path(), 8);

        let err = store
            .save(UploadKind::Rabbit, &upload("image/png", PNG))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PayloadTooLarge);

        let err = store
            .save(UploadKind::Rabbit, &upload("image/png", b""))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_remove_stays_inside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("keep.txt");
        std::fs::write(&outside, "x").unwrap();

        let store = UploadStore::new(tmp.path().join("uploads"), 1024);
        store.remove("../keep.txt").await;
        store.remove(outside.to_str().unwrap()).await;

        assert!(outside.exists());
    }
}
