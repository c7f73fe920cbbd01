use std::marker::PhantomData;
use serde::{Deserialize, Serialize};
use geojson::{FeatureCollection, Geometry, JsonObject};
use schemars::JsonSchema;

/// Properties attached to every exported detection feature
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[schemars(description = "Properties of a detected object footprint")]
pub struct DetectionProperties {
    #[schemars(description = "Tile identifier the detection was found on")]
    pub tile: String,
    #[schemars(description = "Side of the minimum rotated rectangle in metres")]
    pub width: f64,
    #[schemars(description = "Other side of the minimum rotated rectangle in metres")]
    pub length: f64,
}

/// Type alias for detection GeoJSON
pub type DetectionGeoJson = TypedFeatureCollection<DetectionProperties>;

/// A typed GeoJSON Feature that is generic over its properties.
#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    pub feature: geojson::Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    for<'de> P: Serialize + Deserialize<'de>,
{
    /// Creates a new TypedFeature.
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        let feature = geojson::Feature {
            bbox: None,
            geometry,
            id: None,
            properties: serde_json::to_value(properties).ok().and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        };
        Self {
            feature,
            _properties: PhantomData,
        }
    }

    /// Tries to access the typed properties of the feature.
    pub fn properties(&self) -> Option<P> {
        self.feature.properties.as_ref().and_then(|p| {
            serde_json::from_value(serde_json::Value::Object(p.clone())).ok()
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeatureCollection<P> {
    pub bbox: Option<Vec<f64>>,
    pub features: Vec<TypedFeature<P>>,
    pub foreign_members: Option<JsonObject>,
}

impl<P> TypedFeatureCollection<P> {
    /// Get the number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Get features as a slice
    pub fn features(&self) -> &[TypedFeature<P>] {
        &self.features
    }
}

impl<P> From<TypedFeatureCollection<P>> for FeatureCollection {
    fn from(collection: TypedFeatureCollection<P>) -> Self {
        FeatureCollection {
            bbox: collection.bbox,
            features: collection.features.into_iter().map(|f| f.feature).collect(),
            foreign_members: collection.foreign_members,
        }
    }
}
