//! Tag file codec
//!
//! One stamp per line, `id<TAB>x<TAB>y`, sorted by id, newline terminated.
//! Coordinates are written as integers truncated toward zero, so sub-pixel
//! positions do not survive a save/load cycle.

use crate::collection::StampCollection;
use crate::error::{Result, StampError};
use crate::stamp::{Point, StampId};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const FIELD_SEPARATOR: char = '\t';

/// Serialize a collection. Identical collections give identical bytes.
pub fn encode(collection: &StampCollection) -> String {
    let mut text = String::with_capacity(collection.len() * 16);
    for stamp in collection.iter() {
        let _ = writeln!(
            text,
            "{}{sep}{}{sep}{}",
            stamp.id,
            truncate(stamp.x),
            truncate(stamp.y),
            sep = FIELD_SEPARATOR
        );
    }
    text
}

/// Parse a tag file body.
///
/// Blank lines are skipped. Line numbers in errors are 1-based.
pub fn decode(text: &str) -> Result<StampCollection> {
    let mut stamps = BTreeMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (id, position) = parse_line(line, line_number)?;
        if stamps.insert(id, position).is_some() {
            return Err(StampError::DuplicateId(id));
        }
    }

    Ok(StampCollection::from_stamps(stamps))
}

/// Read and decode a tag file.
pub fn read_tags(path: &Path) -> Result<StampCollection> {
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => StampError::not_found(path),
        _ => StampError::io(path, err),
    })?;
    let text = String::from_utf8(bytes).map_err(|err| {
        let valid = &err.as_bytes()[..err.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&byte| byte == b'\n').count() + 1;
        StampError::parse(line, "line is not valid UTF-8")
    })?;

    let collection = decode(&text)?;
    tracing::debug!(path = %path.display(), count = collection.len(), "tag file loaded");
    Ok(collection)
}

/// Encode and write a tag file.
///
/// The body goes to a sibling temporary file first and is renamed into place.
pub fn write_tags(path: &Path, collection: &StampCollection) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, encode(collection)).map_err(|err| StampError::io(&temp_path, err))?;
    fs::rename(&temp_path, path).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        StampError::io(path, err)
    })?;

    tracing::info!(path = %path.display(), count = collection.len(), "tag file written");
    Ok(())
}

fn parse_line(line: &str, line_number: usize) -> Result<(StampId, Point)> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let [id, x, y] = fields.as_slice() else {
        return Err(StampError::parse(
            line_number,
            format!("expected 3 tab-separated fields, found {}", fields.len()),
        ));
    };

    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|_| StampError::parse(line_number, format!("invalid stamp id {id:?}")))?;
    let x = parse_coordinate(x, line_number)?;
    let y = parse_coordinate(y, line_number)?;

    Ok((StampId(id), Point::new(x, y)))
}

fn parse_coordinate(field: &str, line_number: usize) -> Result<f64> {
    let field = field.trim();
    if let Ok(value) = field.parse::<i64>() {
        return Ok(value as f64);
    }

    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(StampError::parse(line_number, format!("invalid coordinate {field:?}"))),
    }
}

fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Integer-positioned collections survive encode/decode unchanged
        #[test]
        fn integer_collections_round_trip(
            stamps in prop::collection::btree_map(any::<u32>(), (any::<i32>(), any::<i32>()), 0..16)
        ) {
            let mut collection = StampCollection::new();
            for (&id, &(x, y)) in &stamps {
                let _ = collection
                    .add(Point::new(f64::from(x), f64::from(y)), Some(StampId(id)))
                    .unwrap();
            }

            let text = encode(&collection);
            prop_assert_eq!(encode(&decode(&text).unwrap()), text.clone());
            prop_assert_eq!(decode(&text).unwrap(), collection);
        }

        /// Fractional positions come back truncated toward zero
        #[test]
        fn fractional_positions_truncate(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6) {
            let mut collection = StampCollection::new();
            let _ = collection.add(Point::new(x, y), None).unwrap();

            let decoded = decode(&encode(&collection)).unwrap();
            prop_assert_eq!(decoded.get(StampId(0)).unwrap().position(), Point::new(x.trunc(), y.trunc()));
        }
    }
}
