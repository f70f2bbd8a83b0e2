//! Reads local image files into `data:` URIs for input slots.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use genflow_core::error::{GenflowError, Result};
use genflow_core::session::ImageData;
use std::path::Path;
use tokio::fs;

/// Upload size ceiling.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

fn infer_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

/// Loads `path` as a base64 `data:` URI.
///
/// Rejects unsupported types and files over [`MAX_IMAGE_BYTES`] with
/// [`GenflowError::Validation`] before reading the contents.
pub async fn load_image_as_data_uri(path: impl AsRef<Path>) -> Result<ImageData> {
    let path = path.as_ref();

    let mime_type = infer_mime_type(path);
    if !ACCEPTED_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(GenflowError::validation(format!(
            "unsupported image type '{}' for {}",
            mime_type,
            path.display()
        )));
    }

    let metadata = fs::metadata(path).await?;
    if metadata.len() > MAX_IMAGE_BYTES {
        return Err(GenflowError::validation(format!(
            "{} is {} bytes, limit is {}",
            path.display(),
            metadata.len(),
            MAX_IMAGE_BYTES
        )));
    }

    let bytes = fs::read(path).await?;
    tracing::debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), mime_type);

    Ok(format!(
        "data:{};base64,{}",
        mime_type,
        BASE64_STANDARD.encode(&bytes)
    ))
}
