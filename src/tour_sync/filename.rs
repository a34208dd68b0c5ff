use crate::common::error::FilenameError;
use crate::common::types::Tour;
use chrono::{DateTime, FixedOffset};
use sanitize_filename::sanitize;

/// Longest file name common filesystems accept, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Suffix of the file a track is downloaded into before being renamed.
pub const PARTIAL_SUFFIX: &str = ".gpx.part";

/// Derive the local track file name for a tour.
///
/// `2023-05-01T10:00:00+02:00` / `Morning Ride` becomes
/// `2023-05-01 10-00-00 plus0200_Morning Ride.gpx`. The offset sign is spelled
/// out (`plus`/`min`) and the name is stripped of characters that are not
/// valid in file names. Long names are cut so that even the partial download
/// file stays within [`MAX_FILE_NAME_BYTES`].
pub fn derive_filename(tour: &Tour) -> Result<String, FilenameError> {
    let date = parse_tour_date(&tour.date)?;
    let stamp = date
        .format("%Y_%m_%d %H_%M_%S %z")
        .to_string()
        .replace('+', "plus")
        .replace('-', "min")
        .replace('_', "-");

    let budget = MAX_FILE_NAME_BYTES - stamp.len() - 1 - PARTIAL_SUFFIX.len();
    let name = truncate_at_char_boundary(file_safe_name(tour), budget);

    Ok(format!("{stamp}_{name}.gpx"))
}

/// Komoot dates are RFC 3339, sometimes with millisecond precision.
pub fn parse_tour_date(raw: &str) -> Result<DateTime<FixedOffset>, FilenameError> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map_err(|source| FilenameError::InvalidDate {
            date: raw.to_string(),
            source,
        })
}

fn file_safe_name(tour: &Tour) -> String {
    let name = sanitize(&tour.name);
    if name.trim().is_empty() {
        format!("tour-{}", sanitize(&tour.id))
    } else {
        name
    }
}

fn truncate_at_char_boundary(mut name: String, max_bytes: usize) -> String {
    if name.len() > max_bytes {
        let mut end = max_bytes;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
        // Windows rejects names ending in a space or dot.
        let trimmed = name.trim_end_matches([' ', '.']).len();
        name.truncate(trimmed);
    }
    name
}
