use std::path::Path;

use geojson::{FeatureCollection, Geometry, Value};

use crate::{
    config::PipelineConfig,
    error::Result,
    projection::Projector,
    typed_geojson::{DetectionGeoJson, DetectionProperties, TypedFeature},
    types::{round3, DetectionRecord},
};

/// Project every vertex of every record into a typed Polygon feature collection.
///
/// Rings are closed on output: an open stored ring gets its first vertex
/// appended, a closed one is emitted as stored.
pub fn to_typed_geojson(records: &[DetectionRecord], config: &PipelineConfig) -> DetectionGeoJson {
    let projector = Projector::from_config(config);

    let features = records
        .iter()
        .map(|record| {
            let origin = config.tile_origin(&record.tile);
            let ring: Vec<Vec<f64>> = projector
                .project_ring(origin, &record.polygon.closed_ring())
                .into_iter()
                .map(|[x, y]| vec![round3(x), round3(y)])
                .collect();

            let properties = DetectionProperties {
                tile: record.tile.to_string(),
                width: record.width_m(),
                length: record.length_m(),
            };
            TypedFeature::new(Some(Geometry::new(Value::Polygon(vec![ring]))), properties)
        })
        .collect();

    let mut foreign_members = serde_json::Map::new();
    foreign_members.insert("zoom".to_string(), serde_json::Value::from(config.zoom));
    foreign_members.insert("feature_count".to_string(), serde_json::Value::from(records.len()));

    DetectionGeoJson {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

pub fn to_geojson(records: &[DetectionRecord], config: &PipelineConfig) -> FeatureCollection {
    to_typed_geojson(records, config).into()
}

/// Export to GeoJSON and serialize to JSON string
pub fn to_geojson_string(records: &[DetectionRecord], config: &PipelineConfig) -> Result<String> {
    let geojson = to_geojson(records, config);
    Ok(serde_json::to_string_pretty(&geojson)?)
}

/// Save GeoJSON to file
pub fn save_geojson<P: AsRef<Path>>(
    path: P,
    records: &[DetectionRecord],
    config: &PipelineConfig,
) -> Result<()> {
    let geojson_string = to_geojson_string(records, config)?;
    std::fs::write(path, geojson_string)?;
    Ok(())
}
