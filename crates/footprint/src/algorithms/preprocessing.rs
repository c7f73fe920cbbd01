use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::{error::Result, traits::MaskDetector, types::RasterMask};

/// Detector for pre-rendered mask images: thresholds the image and, unless
/// `split_components` is off, emits one mask per 8-connected foreground region.
#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    pub threshold: u8,
    pub split_components: bool,
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self {
            threshold: 127,
            split_components: true,
        }
    }
}

impl MaskDetector for ThresholdDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<RasterMask>> {
        let binary = imageproc::contrast::threshold(image, self.threshold);

        if !self.split_components {
            let mask = RasterMask::from_gray(&binary, 0);
            return Ok(if mask.foreground_count() == 0 { Vec::new() } else { vec![mask] });
        }

        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
        let label_count = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0);

        let masks = (1..=label_count)
            .map(|label| {
                RasterMask::from_fn(image.width(), image.height(), |x, y| {
                    labels.get_pixel(x, y).0[0] == label
                })
            })
            .filter(|mask| mask.foreground_count() > 0)
            .collect();

        Ok(masks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> GrayImage {
        let mut img = GrayImage::new(32, 32);
        for y in 2..8 {
            for x in 2..8 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        for y in 20..30 {
            for x in 15..25 {
                img.put_pixel(x, y, Luma([200u8]));
            }
        }
        img
    }

    #[test]
    fn splits_connected_components() {
        let masks = ThresholdDetector::default().detect(&two_blobs()).expect("detect");
        assert_eq!(masks.len(), 2);
        let mut counts: Vec<usize> = masks.iter().map(RasterMask::foreground_count).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![36, 100]);
    }

    #[test]
    fn single_mask_without_splitting() {
        let detector = ThresholdDetector {
            threshold: 127,
            split_components: false,
        };
        let masks = detector.detect(&two_blobs()).expect("detect");
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].foreground_count(), 136);
    }

    #[test]
    fn threshold_filters_dim_pixels() {
        let detector = ThresholdDetector {
            threshold: 220,
            split_components: true,
        };
        let masks = detector.detect(&two_blobs()).expect("detect");
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].foreground_count(), 36);
    }

    #[test]
    fn blank_image_detects_nothing() {
        let masks = ThresholdDetector::default().detect(&GrayImage::new(16, 16)).expect("detect");
        assert!(masks.is_empty());
    }
}
