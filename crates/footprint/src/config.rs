//! Run configuration: tiling scheme, tile scale and vectorizer policies.
//!
//! A [`PipelineConfig`] is loaded once (TOML or JSON, picked by file extension)
//! and validated before any record is processed. Every coordinate produced by
//! the run depends on these values, so a validation failure is fatal.

use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use crate::error::{FootprintError, Result};
use crate::types::TileId;

/// Tiling constants of the Dutch national tiling guideline (zoom 0 extent).
pub const RD_T_MAX: f64 = 903_401.92;
pub const RD_T_MIN: f64 = 22_598.08;
pub const RD_X_ORIGIN: f64 = -285_401.92;
pub const RD_Y_ORIGIN: f64 = 22_598.08;

pub const DEFAULT_ZOOM: u8 = 13;
pub const DEFAULT_TILE_SIZE_PX: u32 = 256;
pub const DEFAULT_TILE_SIZE_M: f64 = 107.52;
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 1.0;

/// Highest zoom accepted by validation.
pub const MAX_ZOOM: u8 = 30;

/// Allowed relative gap between the configured physical tile size and the
/// scheme's tile width at the configured zoom.
const TILE_SIZE_RELATIVE_TOLERANCE: f64 = 1e-3;

/// Parameters of a fixed square tiling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Fixed tiling scheme constants (metres)")]
pub struct TilingScheme {
    #[schemars(description = "Upper bound of the zoom-0 extent")]
    pub t_max: f64,
    #[schemars(description = "Lower bound of the zoom-0 extent")]
    pub t_min: f64,
    #[schemars(description = "World x of column 0's left edge")]
    pub x_origin: f64,
    #[schemars(description = "World y of row 0's bottom edge")]
    pub y_origin: f64,
}

impl Default for TilingScheme {
    fn default() -> Self {
        Self::rijksdriehoek()
    }
}

impl TilingScheme {
    pub const fn rijksdriehoek() -> Self {
        Self {
            t_max: RD_T_MAX,
            t_min: RD_T_MIN,
            x_origin: RD_X_ORIGIN,
            y_origin: RD_Y_ORIGIN,
        }
    }
}

/// What to do with several exterior rings traced from one mask.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RingPolicy {
    /// Every ring becomes its own detection.
    #[default]
    All,
    /// Keep only the first traced ring.
    FirstOnly,
}

/// What to do with vertices that land outside the mask bounds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgePolicy {
    /// Clip coordinates to `[0, width] x [0, height]`.
    #[default]
    Clip,
    /// Drop the whole polygon.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    #[schemars(description = "Zoom level of every tile in the run")]
    pub zoom: u8,
    #[schemars(description = "Tile edge length in pixels")]
    pub tile_size_px: u32,
    #[schemars(description = "Tile edge length in metres")]
    pub tile_size_m: f64,
    #[schemars(description = "Douglas-Peucker tolerance in pixels")]
    pub simplify_tolerance: f64,
    pub ring_policy: RingPolicy,
    pub edge_policy: EdgePolicy,
    #[schemars(description = "Worker threads; defaults to one per core")]
    pub threads: Option<usize>,
    pub scheme: TilingScheme,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            tile_size_px: DEFAULT_TILE_SIZE_PX,
            tile_size_m: DEFAULT_TILE_SIZE_M,
            simplify_tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            ring_policy: RingPolicy::default(),
            edge_policy: EdgePolicy::default(),
            threads: None,
            scheme: TilingScheme::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format, load and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let config = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path_ref)?,
            Some("json") => Self::from_json_file(path_ref)?,
            _ => return Err(FootprintError::UnsupportedConfigFormat(path_ref.to_path_buf())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Get the JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    /// Metres per pixel.
    pub fn scale(&self) -> f64 {
        self.tile_size_m / f64::from(self.tile_size_px)
    }

    /// Tile width of the scheme at the configured zoom.
    pub fn scheme_tile_width(&self) -> f64 {
        crate::tiling::tile_width(&self.scheme, self.zoom)
    }

    /// Lower-left world corner of `tile` at the configured zoom.
    pub fn tile_origin(&self, tile: &TileId) -> [f64; 2] {
        self.scheme.resolve(tile, self.zoom)
    }

    /// Fails when `tile` carries a zoom other than the configured one.
    pub fn check_tile_zoom(&self, tile: &TileId) -> Result<()> {
        match tile.zoom {
            Some(zoom) if zoom != self.zoom => Err(FootprintError::ScaleConfiguration(format!(
                "tile {tile} has zoom {zoom}, run is configured for zoom {}",
                self.zoom
            ))),
            _ => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(FootprintError::ScaleConfiguration(msg));

        if self.zoom > MAX_ZOOM {
            return fail(format!("zoom {} exceeds maximum {}", self.zoom, MAX_ZOOM));
        }
        if self.tile_size_px == 0 {
            return fail("tile_size_px must be positive".to_string());
        }
        if !(self.tile_size_m.is_finite() && self.tile_size_m > 0.0) {
            return fail(format!("tile_size_m must be positive, got {}", self.tile_size_m));
        }
        if !(self.simplify_tolerance.is_finite() && self.simplify_tolerance >= 0.0) {
            return fail(format!(
                "simplify_tolerance must be non-negative, got {}",
                self.simplify_tolerance
            ));
        }
        if self.threads == Some(0) {
            return fail("threads must be at least 1".to_string());
        }

        let scheme = &self.scheme;
        let all_finite = [scheme.t_max, scheme.t_min, scheme.x_origin, scheme.y_origin]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite || scheme.t_max <= scheme.t_min {
            return fail(format!(
                "tiling scheme needs finite bounds with t_max > t_min, got {} / {}",
                scheme.t_max, scheme.t_min
            ));
        }

        let expected = self.scheme_tile_width();
        let relative_gap = (self.tile_size_m - expected).abs() / expected;
        if relative_gap > TILE_SIZE_RELATIVE_TOLERANCE {
            return fail(format!(
                "tile_size_m {} does not match the scheme's tile width {:.4} at zoom {}",
                self.tile_size_m, expected, self.zoom
            ));
        }

        Ok(())
    }
}
