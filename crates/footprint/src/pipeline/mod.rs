//! Batch orchestration: vectorize masks and measure detections over a worker pool.
//!
//! Per-record work is pure. Results are collected in input order; records that
//! fail with a record-local error are logged and omitted, anything else aborts
//! the batch.

use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::PipelineConfig,
    dimensions,
    error::{FootprintError, Result},
    projection::Projector,
    traits::MaskDetector,
    types::{round3, Detection, DetectionRecord, RasterMask, TileId},
    vectorize::{Vectorizer, VectorizerSettings},
};

/// Measure one detection with `config`: dimensions plus projected centroid.
pub fn measure(detection: &Detection, config: &PipelineConfig) -> Result<DetectionRecord> {
    config.check_tile_zoom(&detection.tile)?;

    let projector = Projector::from_config(config);
    let dimensions = dimensions::estimate(&detection.polygon, projector.scale())?;
    let centroid = detection.polygon.centroid().ok_or_else(|| {
        FootprintError::DegenerateGeometry("polygon has no centroid".to_string())
    })?;
    let [x, y] = projector.project(config.tile_origin(&detection.tile), centroid);

    Ok(DetectionRecord {
        tile: detection.tile,
        polygon: detection.polygon.clone(),
        centroid: [round3(x), round3(y)],
        dimensions,
    })
}

pub struct Pipeline {
    config: PipelineConfig,
    vectorizer: Vectorizer,
    pool: Option<rayon::ThreadPool>,
}

impl Pipeline {
    /// Validate `config` and set up the worker pool.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?,
            ),
            None => None,
        };

        Ok(Self {
            vectorizer: Vectorizer::new(VectorizerSettings::from(&config)),
            config,
            pool,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn install<T, F>(&self, op: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    pub fn measure(&self, detection: &Detection) -> Result<DetectionRecord> {
        measure(detection, &self.config)
    }

    /// Measure every detection, in input order.
    ///
    /// A tile whose embedded zoom disagrees with the run is a configuration
    /// error and fails the whole batch before any work starts.
    pub fn measure_all(&self, detections: &[Detection]) -> Result<Vec<DetectionRecord>> {
        for detection in detections {
            self.config.check_tile_zoom(&detection.tile)?;
        }

        let results: Vec<Result<DetectionRecord>> =
            self.install(|| detections.par_iter().map(|d| self.measure(d)).collect());

        let mut records = Vec::with_capacity(results.len());
        for (detection, result) in detections.iter().zip(results) {
            match result {
                Ok(record) => records.push(record),
                Err(err) if err.is_record_local() => {
                    warn!(tile = %detection.tile, reason = %err, "detection omitted");
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            measured = records.len(),
            omitted = detections.len() - records.len(),
            "measured detections"
        );
        Ok(records)
    }

    /// Fails unless a `width`×`height` raster matches the configured tile size.
    ///
    /// The projector scales by `tile_size_m / tile_size_px`, so any other raster
    /// size would put vertices outside their tile.
    pub fn check_raster_size(&self, tile: TileId, width: u32, height: u32) -> Result<()> {
        let expected = self.config.tile_size_px;
        if width != expected || height != expected {
            return Err(FootprintError::ScaleConfiguration(format!(
                "raster for tile {tile} is {width}x{height} px, tiles are {expected}x{expected} px"
            )));
        }
        Ok(())
    }

    /// Vectorize one tile mask into detections on `tile`.
    pub fn vectorize_tile(&self, tile: TileId, mask: &RasterMask) -> Result<Vec<Detection>> {
        self.check_raster_size(tile, mask.width(), mask.height())?;
        Ok(self
            .vectorizer
            .vectorize(mask)
            .into_iter()
            .map(|polygon| Detection { tile, polygon })
            .collect())
    }

    /// Vectorize many masks; output keeps the order of `masks`.
    ///
    /// Every mask is size-checked before any is vectorized.
    pub fn vectorize_all(&self, masks: &[(TileId, RasterMask)]) -> Result<Vec<Detection>> {
        for (tile, mask) in masks {
            self.check_raster_size(*tile, mask.width(), mask.height())?;
        }

        let per_mask: Vec<Vec<Detection>> = self.install(|| {
            masks
                .par_iter()
                .map(|(tile, mask)| self.vectorize_tile(*tile, mask))
                .collect::<Result<Vec<Vec<Detection>>>>()
        })?;

        let detections: Vec<Detection> = per_mask.into_iter().flatten().collect();
        debug!(masks = masks.len(), detections = detections.len(), "vectorized masks");
        Ok(detections)
    }

    /// Run `detector` on a tile image and vectorize every mask it returns.
    pub fn detect_tile<D: MaskDetector>(
        &self,
        detector: &D,
        tile: TileId,
        image: &GrayImage,
    ) -> Result<Vec<Detection>> {
        self.check_raster_size(tile, image.width(), image.height())?;

        let masks = detector.detect(image)?;
        let mut detections = Vec::new();
        for mask in &masks {
            detections.extend(self.vectorize_tile(tile, mask)?);
        }
        debug!(%tile, masks = masks.len(), detections = detections.len(), "detected tile");
        Ok(detections)
    }

    /// Detect and vectorize many tile images on the worker pool, in input order.
    ///
    /// Image sizes are checked up front; a mismatch fails the batch.
    pub fn detect_all<D: MaskDetector>(
        &self,
        detector: &D,
        images: &[(TileId, GrayImage)],
    ) -> Result<Vec<Detection>> {
        for (tile, image) in images {
            self.check_raster_size(*tile, image.width(), image.height())?;
        }

        let per_image: Vec<Vec<Detection>> = self.install(|| {
            images
                .par_iter()
                .map(|(tile, image)| self.detect_tile(detector, *tile, image))
                .collect::<Result<Vec<Vec<Detection>>>>()
        })?;

        let detections: Vec<Detection> = per_image.into_iter().flatten().collect();
        info!(tiles = images.len(), detections = detections.len(), "detected tiles");
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::ThresholdDetector;
    use crate::types::PixelPolygon;
    use image::Luma;

    fn square_mask(x0: u32, y0: u32, side: u32) -> RasterMask {
        RasterMask::from_fn(256, 256, |x, y| {
            (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y)
        })
    }

    fn detection(tile: TileId, vertices: Vec<[f64; 2]>) -> Detection {
        Detection {
            tile,
            polygon: PixelPolygon::new(vertices).expect("valid"),
        }
    }

    #[test]
    fn measure_projects_centroid() {
        let config = PipelineConfig::default();
        let record = measure(
            &detection(
                TileId::new(3700, 4220),
                vec![[0.0, 0.0], [20.0, 0.0], [20.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
            ),
            &config,
        )
        .expect("measure");

        // Centroid pixel (10, 5) on tile origin (112422.08, 476332.48).
        assert_eq!(record.centroid, [round3(112_422.08 + 4.2), round3(476_332.48 + 0.42 * 251.0)]);
        let mut sides = [record.width_m(), record.length_m()];
        sides.sort_by(f64::total_cmp);
        assert_eq!(sides, [4.2, 8.4]);
    }

    #[test]
    fn measure_all_keeps_order_and_omits_degenerate() {
        let pipeline = Pipeline::new(PipelineConfig {
            threads: Some(2),
            ..PipelineConfig::default()
        })
        .expect("pipeline");

        let detections = vec![
            detection(TileId::new(1, 1), vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]]),
            detection(TileId::new(1, 2), vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]),
            detection(TileId::new(1, 3), vec![[0.0, 0.0], [8.0, 0.0], [8.0, 2.0], [0.0, 2.0]]),
        ];
        let records = pipeline.measure_all(&detections).expect("measure");
        let tiles: Vec<TileId> = records.iter().map(|r| r.tile).collect();
        assert_eq!(tiles, vec![TileId::new(1, 1), TileId::new(1, 3)]);
    }

    #[test]
    fn zoom_mismatch_fails_the_batch() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let detections = vec![
            detection(TileId::new(1, 1), vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]]),
            detection(TileId::with_zoom(12, 1, 1), vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]]),
        ];
        assert!(matches!(
            pipeline.measure_all(&detections),
            Err(FootprintError::ScaleConfiguration(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let result = Pipeline::new(PipelineConfig {
            tile_size_m: 50.0,
            ..PipelineConfig::default()
        });
        assert!(matches!(result, Err(FootprintError::ScaleConfiguration(_))));
    }

    #[test]
    fn vectorize_all_preserves_mask_order() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let masks = vec![
            (TileId::new(10, 20), square_mask(40, 40, 10)),
            (TileId::new(10, 21), RasterMask::new(256, 256)),
            (TileId::new(10, 22), square_mask(100, 120, 12)),
        ];
        let detections = pipeline.vectorize_all(&masks).expect("vectorize");
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].tile, TileId::new(10, 20));
        assert_eq!(detections[1].tile, TileId::new(10, 22));
    }

    #[test]
    fn detect_then_measure_end_to_end() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let mut image = GrayImage::new(256, 256);
        for y in 80..90 {
            for x in 50..60 {
                image.put_pixel(x, y, Luma([255]));
            }
        }

        let tile = TileId::with_zoom(13, 3700, 4220);
        let detections = pipeline
            .detect_tile(&ThresholdDetector::default(), tile, &image)
            .expect("detect");
        assert_eq!(detections.len(), 1);

        let records = pipeline.measure_all(&detections).expect("measure");
        assert_eq!(records.len(), 1);
        assert!((records[0].width_m() - 4.2).abs() < 0.25);
        assert!((records[0].length_m() - 4.2).abs() < 0.25);
    }
    #[test]
    fn oversized_mask_fails_instead_of_leaving_the_tile() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let tile = TileId::new(3700, 4220);
        let mask = RasterMask::from_fn(512, 512, |x, y| {
            (400..450).contains(&x) && (400..450).contains(&y)
        });

        assert!(matches!(
            pipeline.vectorize_tile(tile, &mask),
            Err(FootprintError::ScaleConfiguration(_))
        ));

        let masks = vec![(TileId::new(3700, 4219), square_mask(40, 40, 10)), (tile, mask)];
        assert!(matches!(
            pipeline.vectorize_all(&masks),
            Err(FootprintError::ScaleConfiguration(_))
        ));

        let image = GrayImage::new(256, 128);
        assert!(matches!(
            pipeline.detect_tile(&ThresholdDetector::default(), tile, &image),
            Err(FootprintError::ScaleConfiguration(_))
        ));
    }

    #[test]
    fn detect_all_runs_on_the_pool_in_input_order() {
        let pipeline = Pipeline::new(PipelineConfig {
            threads: Some(2),
            ..PipelineConfig::default()
        })
        .expect("pipeline");

        let blob = |x0: u32, y0: u32| {
            let mut image = GrayImage::new(256, 256);
            for y in y0..y0 + 12 {
                for x in x0..x0 + 12 {
                    image.put_pixel(x, y, Luma([255]));
                }
            }
            image
        };
        let images = vec![
            (TileId::new(5, 9), blob(20, 20)),
            (TileId::new(5, 7), GrayImage::new(256, 256)),
            (TileId::new(5, 8), blob(150, 60)),
        ];

        let detections = pipeline
            .detect_all(&ThresholdDetector::default(), &images)
            .expect("detect");
        let tiles: Vec<TileId> = detections.iter().map(|d| d.tile).collect();
        assert_eq!(tiles, vec![TileId::new(5, 9), TileId::new(5, 8)]);

        let mismatched = vec![(TileId::new(5, 9), GrayImage::new(300, 300))];
        assert!(matches!(
            pipeline.detect_all(&ThresholdDetector::default(), &mismatched),
            Err(FootprintError::ScaleConfiguration(_))
        ));
    }
}
