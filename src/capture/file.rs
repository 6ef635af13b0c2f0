use std::path::Path;

use tracing::debug;

use crate::capture::CaptureError;
use crate::media::EncodedImage;

/// Reads a local image and normalizes it to PNG. Anything the decoder rejects
/// surfaces as [`CaptureError::Decode`]; there is no separate format check.
pub async fn capture_from_file(path: &Path) -> Result<EncodedImage, CaptureError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| CaptureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let image = decode_to_png(&bytes)?;
    debug!(
        path = %path.display(),
        source_len = bytes.len(),
        png_len = image.len(),
        "Loaded image from file"
    );
    Ok(image)
}

pub fn decode_to_png(bytes: &[u8]) -> Result<EncodedImage, CaptureError> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(EncodedImage::png_from_dynamic(&decoded)?)
}
