//! Recipe image storage
//!
//! Uploaded images are written under a configured directory and addressed by
//! a public URL. The trait keeps handlers independent of where bytes land.

use std::path::PathBuf;

use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};

/// Image extensions accepted for recipe uploads
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[axum::async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist `bytes` and return the public URL
    async fn save(&self, folder: &str, file_name: &str, bytes: &[u8]) -> AppResult<String>;

    /// Remove a file previously returned by [`MediaStore::save`]; unknown URLs are ignored
    async fn remove(&self, url: &str) -> AppResult<()>;
}

/// Local-filesystem media store
#[derive(Clone)]
pub struct LocalMediaStore {
    root_dir: PathBuf,
    public_base_url: String,
}

impl LocalMediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root_dir: PathBuf::from(&config.root_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn relative_path_of(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base_url)?.trim_start_matches('/');
        if rest.is_empty() || rest.split('/').any(|part| part == "..") {
            return None;
        }
        Some(rest.to_string())
    }
}

/// Lowercased extension of an uploaded file name, if it is an accepted image type
pub fn image_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[axum::async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, folder: &str, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        let ext = image_extension(file_name).ok_or_else(|| {
            AppError::validation(
                "recipe_img",
                "Image must be png, jpg, gif or webp",
                "이미지는 png, jpg, gif, webp 형식만 가능합니다",
            )
        })?;

        let dir = self.root_dir.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&stored_name), bytes)
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        tracing::info!(folder, file = %stored_name, size = bytes.len(), "Stored media file");
        Ok(format!("{}/{}/{}", self.public_base_url, folder, stored_name))
    }

    async fn remove(&self, url: &str) -> AppResult<()> {
        let Some(relative) = self.relative_path_of(url) else {
            return Ok(());
        };

        match tokio::fs::remove_file(self.root_dir.join(&relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageError(e.to_string())),
        }
    }
}
