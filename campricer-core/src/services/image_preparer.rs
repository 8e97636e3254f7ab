//! Image payload preparation
//!
//! Turns one picked asset into a transmittable payload: base64 bytes plus
//! MIME type and filename. Validation failures here are scoped to the single
//! asset; the upload pipeline decides whether that sinks a batch or just
//! skips one image.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::PathBuf;
use thiserror::Error;

/// MIME type assumed when neither the asset nor content sniffing supplies one
pub const DEFAULT_MIME: &str = "image/jpeg";

/// Preparation errors
#[derive(Debug, Error)]
pub enum PrepareError {
    /// Source file missing or empty
    #[error("File unavailable: {0}")]
    FileUnavailable(String),

    /// I/O error reading the source file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Optional re-encode step failed
    #[error("Re-encode failed: {0}")]
    Reencode(String),
}

/// One picked image asset, as supplied by the capture provider
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Path to the image file
    pub path: PathBuf,
    /// MIME type, when the provider knows it
    pub mime: Option<String>,
    /// Original filename, when the provider knows it
    pub file_name: Option<String>,
}

impl ImageAsset {
    /// Build an asset from a bare path, taking the filename from the path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(String::from);
        Self {
            path,
            mime: None,
            file_name,
        }
    }

    /// The asset's path as the string key used by the stores
    pub fn key(&self) -> String {
        self.path.display().to_string()
    }
}

/// Transmittable image payload
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type of the encoded bytes
    pub mime: String,
    /// Filename reported to the service
    pub file_name: String,
}

/// Preparation options
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareOptions {
    /// Re-encode to WebP before upload. Off by default; when on, the
    /// payload's MIME and filename reflect the new format.
    pub reencode_webp: bool,
}

/// Prepare one asset for transmission
///
/// Validates the file exists and is non-empty before reading; a failure
/// affects only this asset.
pub async fn prepare(
    asset: &ImageAsset,
    index: usize,
    options: &PrepareOptions,
) -> Result<ImagePayload, PrepareError> {
    let metadata = tokio::fs::metadata(&asset.path).await.map_err(|_| {
        PrepareError::FileUnavailable(format!("no file at {}", asset.path.display()))
    })?;
    if metadata.len() == 0 {
        return Err(PrepareError::FileUnavailable(format!(
            "empty file at {}",
            asset.path.display()
        )));
    }

    let bytes = tokio::fs::read(&asset.path).await?;

    if options.reencode_webp {
        let webp = tokio::task::spawn_blocking(move || reencode_webp(&bytes))
            .await
            .map_err(|e| PrepareError::Reencode(format!("task join error: {e}")))??;
        tracing::debug!(
            image = %asset.path.display(),
            bytes = webp.len(),
            "re-encoded image to webp"
        );
        return Ok(ImagePayload {
            data: BASE64.encode(&webp),
            mime: "image/webp".to_string(),
            file_name: format!("uploaded_image_{index}.webp"),
        });
    }

    let mime = asset
        .mime
        .clone()
        .or_else(|| infer::get(&bytes).map(|kind| kind.mime_type().to_string()))
        .unwrap_or_else(|| DEFAULT_MIME.to_string());
    let file_name = asset
        .file_name
        .clone()
        .unwrap_or_else(|| format!("uploaded_image_{index}.jpg"));

    Ok(ImagePayload {
        data: BASE64.encode(&bytes),
        mime,
        file_name,
    })
}

fn reencode_webp(bytes: &[u8]) -> Result<Vec<u8>, PrepareError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| PrepareError::Reencode(e.to_string()))?;
    let mut out = Vec::new();
    decoded
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::WebP)
        .map_err(|e| PrepareError::Reencode(e.to_string()))?;
    Ok(out)
}
