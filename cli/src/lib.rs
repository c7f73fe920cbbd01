use std::fs;
use std::path::{Path, PathBuf};

use footprint::{FootprintError, TileId};
use image::GrayImage;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Footprint(#[from] FootprintError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("No tile masks found in {0:?}")]
    NoMasks(PathBuf),
}

/// A mask image on disk, addressed by the tile encoded in its file name.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMaskFile {
    pub tile: TileId,
    pub path: PathBuf,
}

impl TileMaskFile {
    pub fn load(&self) -> Result<GrayImage, CliError> {
        Ok(image::open(&self.path)?.to_luma8())
    }
}

/// List `<zoom>_<column>_<row>.png` / `<column>_<row>.png` files in `dir`,
/// sorted by file name. Other files are skipped with a warning.
pub fn scan_mask_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<TileMaskFile>, CliError> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();

    let mut masks = Vec::new();
    for path in paths {
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match TileId::from_file_stem(stem) {
            Ok(tile) => masks.push(TileMaskFile { tile, path }),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping mask file"),
        }
    }

    if masks.is_empty() {
        return Err(CliError::NoMasks(dir.to_path_buf()));
    }
    debug!(count = masks.len(), "found tile masks");
    Ok(masks)
}
