//! Detector CSV input and measurement CSV output.
//!
//! Input rows are `tile,polygon` after a header row. Output rows are
//! `tile,polygon,centroid,width,length`. Polygons are written as JSON arrays of
//! `[x, y]` pairs.
//!
//! Polygon payloads are parsed strictly: JSON pairs, flat JSON number lists,
//! or the tuple-list text written by the reference deployment
//! (`[(x, y), ...]`). Tuple text is accepted only when every character belongs
//! to the numeric list grammar; it is then handed to the JSON parser with
//! parentheses turned into brackets. Nothing is ever evaluated.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FootprintError, Result};
use crate::types::{Detection, DetectionRecord, PixelPolygon, TileId};

/// Columns of a detector output row.
const INPUT_COLUMNS: usize = 2;

#[derive(Debug, Serialize)]
struct DetectionRow {
    tile: String,
    polygon: String,
}

#[derive(Debug, Serialize)]
struct RecordRow {
    tile: String,
    polygon: String,
    centroid: String,
    width: f64,
    length: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolygonPayload {
    Pairs(Vec<[f64; 2]>),
    Flat(Vec<f64>),
}

fn is_list_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_whitespace() || matches!(c, '.' | '-' | '+' | 'e' | 'E' | ',' | '[' | ']' | '(' | ')')
}

/// Parse a serialized pixel polygon.
pub fn parse_polygon(text: &str) -> Result<PixelPolygon> {
    let trimmed = text.trim();

    let normalized: Cow<'_, str> = if trimmed.contains('(') {
        if let Some(bad) = trimmed.chars().find(|&c| !is_list_char(c)) {
            return Err(FootprintError::MalformedInputRecord(format!(
                "unexpected character {bad:?} in polygon payload"
            )));
        }
        Cow::Owned(trimmed.replace('(', "[").replace(')', "]"))
    } else {
        Cow::Borrowed(trimmed)
    };

    let payload: PolygonPayload = serde_json::from_str(&normalized).map_err(|_| {
        FootprintError::MalformedInputRecord(
            "polygon is not a list of coordinate pairs".to_string(),
        )
    })?;

    let vertices = match payload {
        PolygonPayload::Pairs(pairs) => pairs,
        PolygonPayload::Flat(values) => {
            if values.len() % 2 != 0 {
                return Err(FootprintError::MalformedInputRecord(format!(
                    "flat polygon has an odd number of values ({})",
                    values.len()
                )));
            }
            values.chunks_exact(2).map(|pair| [pair[0], pair[1]]).collect()
        }
    };

    PixelPolygon::new(vertices)
}

/// Serialize a pixel polygon as a JSON array of pairs.
pub fn format_polygon(polygon: &PixelPolygon) -> Result<String> {
    Ok(serde_json::to_string(polygon)?)
}

/// Read detector rows, skipping (and logging) malformed ones.
pub fn read_detections<R: Read>(reader: R) -> Result<Vec<Detection>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut detections = Vec::new();
    let mut skipped = 0usize;

    for result in csv_reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                warn!(error = %err, "skipping unreadable row");
                skipped += 1;
                continue;
            }
        };
        let line = record.position().map_or(0, csv::Position::line);

        if record.len() != INPUT_COLUMNS {
            warn!(line, columns = record.len(), "broken entry ignored: expected 2 columns");
            skipped += 1;
            continue;
        }

        let tile = match record[0].parse::<TileId>() {
            Ok(tile) => tile,
            Err(err) => {
                warn!(line, error = %err, "skipping row");
                skipped += 1;
                continue;
            }
        };

        match parse_polygon(&record[1]) {
            Ok(polygon) => detections.push(Detection { tile, polygon }),
            Err(err) => {
                warn!(line, %tile, error = %err, "skipping row");
                skipped += 1;
            }
        }
    }

    debug!(read = detections.len(), skipped, "read detections");
    Ok(detections)
}

pub fn read_detections_file<P: AsRef<Path>>(path: P) -> Result<Vec<Detection>> {
    let file = File::open(path)?;
    read_detections(BufReader::new(file))
}

pub fn write_detections<W: Write>(writer: W, detections: &[Detection]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for detection in detections {
        csv_writer.serialize(DetectionRow {
            tile: detection.tile.to_string(),
            polygon: format_polygon(&detection.polygon)?,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_detections_file<P: AsRef<Path>>(path: P, detections: &[Detection]) -> Result<()> {
    let file = File::create(path)?;
    write_detections(BufWriter::new(file), detections)
}

pub fn write_records<W: Write>(writer: W, records: &[DetectionRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(RecordRow {
            tile: record.tile.to_string(),
            polygon: format_polygon(&record.polygon)?,
            centroid: serde_json::to_string(&record.centroid)?,
            width: record.width_m(),
            length: record.length_m(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_records_file<P: AsRef<Path>>(path: P, records: &[DetectionRecord]) -> Result<()> {
    let file = File::create(path)?;
    write_records(BufWriter::new(file), records)
}
