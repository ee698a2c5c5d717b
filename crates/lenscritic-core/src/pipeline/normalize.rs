//! Image normalization: a lossless preview for display and a bounded JPEG
//! payload for providers.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;

use super::decode::{DecodedImage, ImageDecoder};
use crate::config::{ImageConfig, LimitsConfig};
use crate::error::CritiqueError;
use crate::llm::ImageInput;

/// Full-resolution PNG copy of the input, as a data URI. Display only.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

impl PreviewImage {
    /// Decode the PNG bytes back out of the data URI.
    pub fn png_bytes(&self) -> Result<Vec<u8>, CritiqueError> {
        BASE64
            .decode(strip_data_uri_preamble(&self.data_uri))
            .map_err(|e| CritiqueError::Render {
                message: format!("Preview is not valid base64: {e}"),
            })
    }
}

/// Downscaled JPEG copy of the input that is sent to providers.
#[derive(Debug, Clone)]
pub struct CompactImage {
    /// Pure base64 payload (no data-URI preamble) and its media type
    pub image: ImageInput,
    pub width: u32,
    pub height: u32,
}

/// Both renditions of one input image.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub preview: PreviewImage,
    pub compact: CompactImage,
}

/// Turns arbitrary image bytes into a preview and a provider-safe payload.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    decoder: ImageDecoder,
    config: ImageConfig,
}

impl ImageNormalizer {
    pub fn new(config: ImageConfig, limits: LimitsConfig) -> Self {
        Self {
            decoder: ImageDecoder::new(limits),
            config,
        }
    }

    /// Decode and produce both renditions.
    pub async fn normalize(&self, bytes: Vec<u8>) -> Result<NormalizedImage, CritiqueError> {
        let decoded = self.decode(bytes).await?;
        let image = Arc::new(decoded.image);
        let preview = self.preview(Arc::clone(&image)).await?;
        let compact = self.compact(image).await?;
        Ok(NormalizedImage { preview, compact })
    }

    /// Decode input bytes.
    pub async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedImage, CritiqueError> {
        self.decoder.decode(bytes).await
    }

    /// Encode the lossless preview on the blocking pool.
    pub async fn preview(&self, image: Arc<DynamicImage>) -> Result<PreviewImage, CritiqueError> {
        tokio::task::spawn_blocking(move || encode_preview(&image))
            .await
            .map_err(|e| CritiqueError::Render {
                message: format!("Task join error: {e}"),
            })?
    }

    /// Encode the bounded JPEG payload on the blocking pool.
    pub async fn compact(&self, image: Arc<DynamicImage>) -> Result<CompactImage, CritiqueError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || encode_compact(&image, &config))
            .await
            .map_err(|e| CritiqueError::Render {
                message: format!("Task join error: {e}"),
            })?
    }
}

/// Target dimensions so the larger side is at most `max_dimension`.
///
/// Never upscales. The smaller side is rounded and kept at least 1px.
pub fn compact_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let larger = width.max(height);
    if larger <= max_dimension {
        return (width, height);
    }
    let scale = |side: u32| -> u32 {
        let scaled = (side as f64 * max_dimension as f64 / larger as f64).round() as u32;
        scaled.max(1)
    };
    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Return the payload after the first comma of a data URI, or the input
/// unchanged if it has no `data:` preamble.
pub fn strip_data_uri_preamble(value: &str) -> &str {
    if value.starts_with("data:") {
        value.split_once(',').map_or(value, |(_, payload)| payload)
    } else {
        value
    }
}

fn encode_preview(image: &DynamicImage) -> Result<PreviewImage, CritiqueError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| CritiqueError::Render {
            message: format!("PNG encoding failed: {e}"),
        })?;

    Ok(PreviewImage {
        data_uri: format!("data:image/png;base64,{}", BASE64.encode(buffer.into_inner())),
        width: image.width(),
        height: image.height(),
    })
}

fn encode_compact(image: &DynamicImage, config: &ImageConfig) -> Result<CompactImage, CritiqueError> {
    let (width, height) = compact_dimensions(image.width(), image.height(), config.max_dimension);

    // JPEG has no alpha channel
    let rgb = if (width, height) == (image.width(), image.height()) {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        tracing::debug!(
            "Downscaling {}x{} -> {}x{}",
            image.width(),
            image.height(),
            width,
            height
        );
        DynamicImage::ImageRgb8(
            image
                .resize_exact(width, height, FilterType::CatmullRom)
                .to_rgb8(),
        )
    };

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, config.jpeg_quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| CritiqueError::Render {
            message: format!("JPEG encoding failed: {e}"),
        })?;

    let bytes = buffer.into_inner();
    tracing::debug!("Compact image: {}x{}, {} bytes", width, height, bytes.len());

    Ok(CompactImage {
        image: ImageInput::jpeg(&bytes),
        width,
        height,
    })
}
