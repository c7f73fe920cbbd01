//! Raster mask → simplified pixel polygons.
//!
//! Steps: trace contours on the padded mask, drop holes, simplify each
//! exterior ring (Douglas-Peucker), drop rings that collapse, apply the edge
//! policy, then the ring policy.

use tracing::debug;

use crate::{
    algorithms::{apply_edge_policy, simplify_ring, ContainmentHoleDetector, MarchingSquares},
    config::{EdgePolicy, PipelineConfig, RingPolicy, DEFAULT_SIMPLIFY_TOLERANCE},
    traits::{ContourExtractor, HoleDetector},
    types::{PixelPolygon, RasterMask},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorizerSettings {
    pub tolerance: f64,
    pub ring_policy: RingPolicy,
    pub edge_policy: EdgePolicy,
}

impl Default for VectorizerSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            ring_policy: RingPolicy::default(),
            edge_policy: EdgePolicy::default(),
        }
    }
}

impl From<&PipelineConfig> for VectorizerSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            tolerance: config.simplify_tolerance,
            ring_policy: config.ring_policy,
            edge_policy: config.edge_policy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vectorizer<C = MarchingSquares, H = ContainmentHoleDetector>
where
    C: ContourExtractor,
    H: HoleDetector,
{
    pub contour_extractor: C,
    pub hole_detector: H,
    pub settings: VectorizerSettings,
}

impl Vectorizer {
    pub fn new(settings: VectorizerSettings) -> Self {
        Self::with_components(MarchingSquares, ContainmentHoleDetector, settings)
    }
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new(VectorizerSettings::default())
    }
}

impl<C, H> Vectorizer<C, H>
where
    C: ContourExtractor,
    H: HoleDetector,
{
    pub fn with_components(contour_extractor: C, hole_detector: H, settings: VectorizerSettings) -> Self {
        Self {
            contour_extractor,
            hole_detector,
            settings,
        }
    }

    pub fn vectorize(&self, mask: &RasterMask) -> Vec<PixelPolygon> {
        // A uniform mask has no boundary to trace.
        if mask.is_uniform() {
            return Vec::new();
        }

        let contours = self.contour_extractor.extract_contours(mask);
        let traced = contours.len();
        let exteriors = self.hole_detector.exterior_rings(contours);

        let mut polygons: Vec<PixelPolygon> = exteriors
            .iter()
            .filter_map(|ring| simplify_ring(ring, self.settings.tolerance))
            .filter_map(|ring| {
                apply_edge_policy(ring, mask.width(), mask.height(), self.settings.edge_policy)
            })
            .filter_map(|ring| PixelPolygon::new(ring).ok())
            .collect();

        debug!(
            traced,
            exteriors = exteriors.len(),
            polygons = polygons.len(),
            "vectorized mask"
        );

        if self.settings.ring_policy == RingPolicy::FirstOnly && polygons.len() > 1 {
            debug!(dropped = polygons.len() - 1, "keeping first ring only");
            polygons.truncate(1);
        }

        polygons
    }
}

/// Vectorize with the reference settings (tolerance 1.0 px, all rings, clipping).
pub fn vectorize(mask: &RasterMask) -> Vec<PixelPolygon> {
    Vectorizer::default().vectorize(mask)
}
