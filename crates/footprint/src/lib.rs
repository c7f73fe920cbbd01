//! # Footprint
//!
//! Turns per-object raster masks found on map tiles into geo-referenced
//! polygons with physical dimensions, in the Dutch national planar grid
//! (Rijksdriehoek).
//!
//! ## Core Features
//!
//! - **Vectorizer**: marching squares contours, hole removal and Douglas-Peucker simplification
//! - **Tiling**: tile id to world origin under a configurable tiling scheme
//! - **Projection**: pixel to planar metres, y axis flipped
//! - **Dimensions**: width/length from the minimum-area rotated rectangle
//! - **Export**: detector CSV in, measurement CSV and GeoJSON out
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use footprint::{Pipeline, PipelineConfig, io};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//!
//! let detections = io::read_detections_file("detections.csv")?;
//! let records = pipeline.measure_all(&detections)?;
//!
//! io::write_records_file("records.csv", &records)?;
//! io::save_geojson("records.geojson", &records, pipeline.config())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## From mask images
//!
//! ```rust,no_run
//! use footprint::{Pipeline, PipelineConfig, ThresholdDetector, TileId};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let image = image::open("13_3700_4220.png")?.to_luma8();
//! let tile = TileId::from_file_stem("13_3700_4220")?;
//!
//! let detections = pipeline.detect_tile(&ThresholdDetector::default(), tile, &image)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod vectorize;
pub mod tiling;
pub mod projection;
pub mod dimensions;
pub mod io;
pub mod typed_geojson;
pub mod pipeline;
pub mod render;

pub use error::{FootprintError, Result};
pub use types::{round3, Detection, DetectionRecord, Dimensions, PixelPolygon, RasterMask, TileId};
pub use config::{EdgePolicy, PipelineConfig, RingPolicy, TilingScheme};
pub use traits::*;
pub use algorithms::{ContainmentHoleDetector, MarchingSquares, NoHoleDetector, ThresholdDetector};
pub use vectorize::{vectorize, Vectorizer, VectorizerSettings};
pub use projection::{project, Projector};
pub use dimensions::estimate;
pub use pipeline::{measure, Pipeline};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_tile_resolves() {
        let config = PipelineConfig::default();
        let [x, y] = config.tile_origin(&"3700/4220".parse().expect("tile"));
        assert_eq!(round3(x), 112_422.08);
        assert_eq!(round3(y), 476_332.48);
    }

    #[test]
    fn mask_to_geojson_end_to_end() {
        let pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let tile: TileId = "13_3700_4220".parse().expect("tile");
        let mask = RasterMask::from_fn(256, 256, |x, y| (50..70).contains(&x) && (100..110).contains(&y));

        let detections = pipeline.vectorize_tile(tile, &mask).expect("vectorize");
        assert_eq!(detections.len(), 1);

        let records = pipeline.measure_all(&detections).expect("measure");
        let collection = io::to_geojson(&records, pipeline.config());
        assert_eq!(collection.features.len(), 1);

        // Every projected vertex stays inside the tile footprint.
        let [x0, y0] = pipeline.config().tile_origin(&tile);
        let Some(geojson::Value::Polygon(rings)) =
            collection.features[0].geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected polygon geometry");
        };
        for coord in &rings[0] {
            assert!(coord[0] >= x0 && coord[0] <= x0 + 107.52);
            assert!(coord[1] >= y0 && coord[1] <= y0 + 107.52);
        }
    }

    #[test]
    fn csv_round_trip_through_measurement() {
        let input = "tile,polygon\n3700/4220,\"[(10, 10), (30, 10), (30, 20), (10, 20), (10, 10)]\"\n";
        let detections = io::read_detections(input.as_bytes()).expect("read");
        let records = Pipeline::new(PipelineConfig::default())
            .expect("pipeline")
            .measure_all(&detections)
            .expect("measure");

        let mut buffer = Vec::new();
        io::write_records(&mut buffer, &records).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.starts_with("tile,polygon,centroid,width,length\n3700/4220,"));
        assert!(text.contains("8.4"));
        assert!(text.contains("4.2"));
    }
}
