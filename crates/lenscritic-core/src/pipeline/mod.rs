//! Image preparation stages.
//!
//! - **decode**: Load and decode images from arbitrary formats
//! - **normalize**: Produce the display preview and the provider payload

pub mod decode;
pub mod normalize;

// Re-exports for convenient access
pub use decode::{format_to_string, DecodedImage, ImageDecoder};
pub use normalize::{
    compact_dimensions, strip_data_uri_preamble, CompactImage, ImageNormalizer, NormalizedImage,
    PreviewImage,
};
