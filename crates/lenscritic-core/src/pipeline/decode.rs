//! Image decoding with content-based format detection and size limits.

use image::{DynamicImage, GenericImageView, ImageDecoder as _, ImageFormat};
use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::CritiqueError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Image decoder with configurable limits.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Original file size in bytes
    pub file_size: u64,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an image from an in-memory byte buffer.
    ///
    /// The size limit is checked before any decoding work; decoding itself
    /// runs on the blocking pool.
    pub async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedImage, CritiqueError> {
        let file_size = bytes.len() as u64;
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(BYTES_PER_MB);
        if file_size > max_bytes {
            return Err(CritiqueError::FileTooLarge {
                size_mb: file_size.div_ceil(BYTES_PER_MB),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        tokio::task::spawn_blocking(move || Self::decode_bytes_sync(bytes))
            .await
            .map_err(|e| CritiqueError::Decode {
                message: format!("Task join error: {e}"),
            })?
    }

    /// Synchronous decode from bytes (runs in spawn_blocking).
    fn decode_bytes_sync(bytes: Vec<u8>) -> Result<DecodedImage, CritiqueError> {
        let file_size = bytes.len() as u64;
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CritiqueError::Decode {
                message: format!("Cannot detect image format: {e}"),
            })?;
        let format = reader.format().ok_or_else(|| CritiqueError::Decode {
            message: "Unrecognized image format".to_string(),
        })?;
        let decode_error = |e: image::ImageError| CritiqueError::Decode {
            message: e.to_string(),
        };
        let mut decoder = reader.into_decoder().map_err(decode_error)?;
        let orientation = decoder.orientation().map_err(decode_error)?;
        let mut image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
        // Pixels are stored as shot; EXIF says how to display them.
        image.apply_orientation(orientation);

        let (width, height) = image.dimensions();
        tracing::debug!(
            "Decoded {} image {}x{} ({} bytes)",
            format_to_string(format),
            width,
            height,
            file_size
        );
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            file_size,
        })
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        ImageFormat::Pnm => "pnm",
        ImageFormat::Avif => "avif",
        _ => "unknown",
    }
}

#[cfg(test)]
/// 40x20 JPEG carrying an EXIF block with Orientation=6 (rotate 90° CW).
pub(crate) fn exif_rotated_jpeg() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(40, 20)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    let jpeg = buffer.into_inner();

    #[rustfmt::skip]
    let exif: [u8; 32] = [
        b'E', b'x', b'i', b'f', 0, 0,
        // Big-endian TIFF header, first IFD at offset 8
        b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08,
        // One entry: Orientation (0x0112), SHORT, count 1, value 6
        0x00, 0x01,
        0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x06, 0x00, 0x00,
        // No next IFD
        0x00, 0x00, 0x00, 0x00,
    ];
    let segment_len = (exif.len() + 2) as u16;

    // APP1 goes right after SOI
    let mut bytes = jpeg[..2].to_vec();
    bytes.extend_from_slice(&[0xFF, 0xE1]);
    bytes.extend_from_slice(&segment_len.to_be_bytes());
    bytes.extend_from_slice(&exif);
    bytes.extend_from_slice(&jpeg[2..]);
    bytes
}
