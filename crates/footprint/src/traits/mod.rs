use image::GrayImage;
use crate::{error::Result, types::RasterMask};

/// Object detector seam: one tile image in, one mask per detected object out.
pub trait MaskDetector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Result<Vec<RasterMask>>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Trace closed contours, in tile-local pixel coordinates (x, y).
    fn extract_contours(&self, mask: &RasterMask) -> Vec<Vec<[f64; 2]>>;
}

/// Trait for hole detection algorithms
pub trait HoleDetector: Send + Sync {
    /// Keep only the contours that bound an exterior.
    fn exterior_rings(&self, contours: Vec<Vec<[f64; 2]>>) -> Vec<Vec<[f64; 2]>>;
}
