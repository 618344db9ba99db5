//! Decoded icon bitmaps

use crate::error::{FaviconError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::fmt;
use std::sync::Arc;

/// An immutable decoded icon
///
/// Cloning is cheap; clones share the same bitmap.
#[derive(Clone)]
pub struct IconImage {
    image: Arc<DynamicImage>,
}

impl IconImage {
    /// Decode PNG, ICO, GIF, JPEG and the other raster formats `image` knows
    pub fn decode(data: &[u8]) -> Result<Self> {
        let image =
            image::load_from_memory(data).map_err(|e| FaviconError::Decode(e.to_string()))?;
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Downscale so neither side exceeds `dimension`, keeping the aspect ratio
    ///
    /// Icons already within bounds are returned as-is (sharing the bitmap).
    pub fn scaled_to_fit(&self, dimension: u32) -> IconImage {
        let (width, height) = self.image.dimensions();
        if width <= dimension && height <= dimension {
            return self.clone();
        }
        IconImage::from_image(self.image.resize(dimension, dimension, FilterType::Lanczos3))
    }

    /// True when both handles share one bitmap
    pub fn ptr_eq(&self, other: &IconImage) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl fmt::Debug for IconImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
