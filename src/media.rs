use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("image payload is empty")]
    Empty,
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Binary format tag of an [`EncodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Heic,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Heic => "image/heic",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
            ImageFormat::Heic => "heic",
        }
    }

    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match normalize_mime_type(mime_type).as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::Webp),
            "image/heic" | "image/heif" => Some(ImageFormat::Heic),
            _ => None,
        }
    }
}

pub fn normalize_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// An immutable image payload together with its format. Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Arc<[u8]>,
    format: ImageFormat,
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, format: ImageFormat) -> Result<Self, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        Ok(Self {
            bytes: bytes.into(),
            format,
        })
    }

    /// Wraps raw bytes, sniffing the format from the magic number and falling back
    /// to `declared_mime` when sniffing is inconclusive.
    pub fn from_bytes(bytes: Vec<u8>, declared_mime: Option<&str>) -> Result<Self, MediaError> {
        let detected = detect_mime_type(&bytes);
        let format = detected
            .as_deref()
            .and_then(ImageFormat::from_mime)
            .or_else(|| declared_mime.and_then(ImageFormat::from_mime))
            .ok_or_else(|| {
                MediaError::UnsupportedType(
                    detected
                        .or_else(|| declared_mime.map(str::to_string))
                        .unwrap_or_else(|| "unknown".to_string()),
                )
            })?;
        Self::new(bytes, format)
    }

    pub fn from_base64(data: &str, declared_mime: Option<&str>) -> Result<Self, MediaError> {
        let bytes = general_purpose::STANDARD.decode(data.trim())?;
        Self::from_bytes(bytes, declared_mime)
    }

    pub fn png_from_dynamic(image: &DynamicImage) -> Result<Self, MediaError> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, image::ImageFormat::Png)?;
        Self::new(buffer.into_inner(), ImageFormat::Png)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Pixel dimensions read from the header, if the decoder understands the format.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(self.bytes()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{Rgb, RgbImage};

    use super::*;

    pub fn png(width: u32, height: u32, shade: u8) -> EncodedImage {
        let image = RgbImage::from_pixel(width, height, Rgb([shade, shade / 2, 255 - shade]));
        EncodedImage::png_from_dynamic(&DynamicImage::ImageRgb8(image))
            .expect("encode fixture png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_png_and_reads_back_dimensions() {
        let image = fixtures::png(4, 3, 10);
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!(image.dimensions(), Some((4, 3)));
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn sniffed_format_wins_over_declared_mime() {
        let png = fixtures::png(2, 2, 0);
        let rewrapped = EncodedImage::from_bytes(png.bytes().to_vec(), Some("image/jpeg"))
            .expect("png bytes");
        assert_eq!(rewrapped.format(), ImageFormat::Png);
    }

    #[test]
    fn rejects_empty_and_unknown_payloads() {
        assert!(matches!(
            EncodedImage::from_bytes(Vec::new(), Some("image/png")),
            Err(MediaError::Empty)
        ));
        assert!(matches!(
            EncodedImage::from_bytes(b"plain text".to_vec(), Some("text/plain")),
            Err(MediaError::UnsupportedType(_))
        ));
    }

    #[test]
    fn normalizes_jpg_alias() {
        assert_eq!(ImageFormat::from_mime("IMAGE/JPG"), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn invalid_base64_is_reported() {
        assert!(matches!(
            EncodedImage::from_base64("***", Some("image/png")),
            Err(MediaError::Base64(_))
        ));
    }
}
