use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::surface::OutputFormat;

pub type ImageId = u64;

const EDITED_PREFIX: &str = "edited";

/// Reference to the image an editing session works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl ImageSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Bytes(Arc::from(bytes))
    }

    /// Short description safe for logs; byte buffers are not dumped.
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => format!("url:{url}"),
            Self::Path(path) => format!("path:{}", path.display()),
            Self::Bytes(bytes) => format!("bytes:{}", bytes.len()),
        }
    }
}

/// Server-side record for a committed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedImageRecord {
    pub id: ImageId,
    pub local_path: String,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub is_analyzed: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRequest {
    pub image_id: Option<ImageId>,
    pub format: OutputFormat,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no image registered for id {0}")]
    MissingImage(ImageId),
    #[error("{0} sources are not supported by this store")]
    UnsupportedSource(&'static str),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("http error: {0}")]
    Http(String),
    #[error("server rejected request ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("server returned an invalid image record: {0}")]
    InvalidRecord(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Supplies encoded image bytes.
pub trait ImageFetcher {
    fn fetch(&self, source: &ImageSource) -> impl Future<Output = StorageResult<Vec<u8>>> + Send;

    /// Bytes of a persisted image, by record id.
    fn fetch_by_id(&self, image_id: ImageId)
        -> impl Future<Output = StorageResult<Vec<u8>>> + Send;
}

impl<T> ImageFetcher for &T
where
    T: ImageFetcher + Sync + ?Sized,
{
    fn fetch(&self, source: &ImageSource) -> impl Future<Output = StorageResult<Vec<u8>>> + Send {
        (**self).fetch(source)
    }

    fn fetch_by_id(
        &self,
        image_id: ImageId,
    ) -> impl Future<Output = StorageResult<Vec<u8>>> + Send {
        (**self).fetch_by_id(image_id)
    }
}

/// Persists a finished image and reports the resulting record.
pub trait ImageCommitter {
    fn commit(
        &self,
        bytes: Vec<u8>,
        request: CommitRequest,
    ) -> impl Future<Output = StorageResult<PersistedImageRecord>> + Send;
}

/// Filesystem-backed store: reads registered images and local paths, writes
/// committed images into an output directory.
#[derive(Debug)]
pub struct FileImageStore {
    output_dir: PathBuf,
    images: HashMap<ImageId, PathBuf>,
    next_serial: AtomicU64,
}

impl FileImageStore {
    pub fn with_paths(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            images: HashMap::new(),
            next_serial: AtomicU64::new(1),
        }
    }

    pub fn register_image(&mut self, image_id: ImageId, path: PathBuf) {
        self.images.insert(image_id, path);
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn allocate_target_path(&self, image_id: Option<ImageId>, format: OutputFormat) -> PathBuf {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let stem = match image_id {
            Some(id) => format!("{id}-{EDITED_PREFIX}-{serial}"),
            None => format!("{EDITED_PREFIX}-{serial}"),
        };
        self.output_dir.join(format!("{stem}.{}", format.extension()))
    }

    async fn read_path(path: &Path) -> StorageResult<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ImageFetcher for FileImageStore {
    async fn fetch(&self, source: &ImageSource) -> StorageResult<Vec<u8>> {
        match source {
            ImageSource::Path(path) => Self::read_path(path).await,
            ImageSource::Bytes(bytes) => Ok(bytes.to_vec()),
            ImageSource::Url(_) => Err(StorageError::UnsupportedSource("url")),
        }
    }

    async fn fetch_by_id(&self, image_id: ImageId) -> StorageResult<Vec<u8>> {
        let path = self
            .images
            .get(&image_id)
            .ok_or(StorageError::MissingImage(image_id))?;
        Self::read_path(path).await
    }
}

impl ImageCommitter for FileImageStore {
    async fn commit(
        &self,
        bytes: Vec<u8>,
        request: CommitRequest,
    ) -> StorageResult<PersistedImageRecord> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let target = self.allocate_target_path(request.image_id, request.format);
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: target.clone(),
                source,
            })?;
        tracing::info!(path = %target.display(), bytes = bytes.len(), "committed edited image");

        let original_url = request
            .image_id
            .and_then(|id| self.images.get(&id))
            .map(|path| path.display().to_string());
        Ok(PersistedImageRecord {
            id: request.image_id.unwrap_or(0),
            local_path: target.display().to_string(),
            original_url,
            is_analyzed: false,
            created_at: None,
        })
    }
}
