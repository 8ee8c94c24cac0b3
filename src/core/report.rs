use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::core::metadata::{format_size, format_timestamp};
use crate::models::{ExifValue, GpsCoordinate, MetadataRecord};

const HEADER_WIDTH: usize = 50;

pub const DEFAULT_EXPORT_NAME: &str = "metadata_export.txt";

/// Renders the three metadata sections as the flat text shown in the inspector.
pub fn render_report(record: &MetadataRecord) -> String {
    let mut out = String::new();

    push_section_header(&mut out, "FILE INFORMATION");
    push_entries(
        &mut out,
        &[
            ("File name", record.file.filename.clone()),
            ("Path", record.file.path.clone()),
            ("Format", record.image.format.clone()),
            ("File size", format_size(record.file.size)),
            ("Created", format_timestamp(&record.file.created)),
            ("Modified", format_timestamp(&record.file.modified)),
        ],
    );

    push_section_header(&mut out, "IMAGE INFORMATION");
    push_entries(
        &mut out,
        &[
            (
                "Dimensions",
                format!("{} x {} pixels", record.image.width, record.image.height),
            ),
            ("Color mode", record.image.color_mode.clone()),
            (
                "Resolution",
                record
                    .image
                    .resolution
                    .map(|resolution| resolution.to_string())
                    .unwrap_or_else(|| String::from("Not specified")),
            ),
        ],
    );

    push_section_header(&mut out, "EXIF METADATA");
    if record.exif.is_empty() {
        out.push_str("No EXIF metadata found\n");
    }
    for (name, value) in &record.exif {
        match value {
            ExifValue::Gps(coordinate) => {
                let _ = writeln!(out, "GPS Latitude : {}", coordinate.latitude);
                let _ = writeln!(out, "GPS Longitude : {}", coordinate.longitude);
            }
            other => {
                let _ = writeln!(out, "{name}: {other}");
            }
        }
    }

    out
}

/// Writes `text` verbatim as UTF-8.
pub fn export_report(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text.as_bytes())
}

pub fn maps_url(coordinate: &GpsCoordinate) -> String {
    format!(
        "https://www.google.com/maps?q={},{}",
        coordinate.latitude, coordinate.longitude
    )
}

fn push_section_header(out: &mut String, title: &str) {
    let padding = HEADER_WIDTH.saturating_sub(title.len()) / 2;
    out.push('\n');
    out.push_str(&" ".repeat(padding));
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(HEADER_WIDTH));
    out.push_str("\n\n");
}

fn push_entries(out: &mut String, entries: &[(&str, String)]) {
    for (key, value) in entries {
        let _ = writeln!(out, "{key} : {value}");
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Local, TimeZone};

    use super::*;
    use crate::models::{FileInfo, ImageInfo, Resolution, GPS_TAG};

    fn record(exif: BTreeMap<String, ExifValue>, resolution: Option<Resolution>) -> MetadataRecord {
        let stamp = Local
            .with_ymd_and_hms(2023, 11, 2, 14, 30, 0)
            .single()
            .expect("unambiguous local time");

        MetadataRecord {
            file: FileInfo {
                filename: String::from("beach.jpg"),
                path: String::from("/photos/beach.jpg"),
                size: 2048,
                created: stamp,
                modified: stamp,
            },
            image: ImageInfo {
                format: String::from("JPEG"),
                color_mode: String::from("RGB"),
                width: 640,
                height: 480,
                resolution,
            },
            exif,
        }
    }

    #[test]
    fn sections_and_headers() {
        let text = render_report(&record(BTreeMap::new(), None));

        let header = format!("\n{}FILE INFORMATION\n{}\n\n", " ".repeat(17), "=".repeat(50));
        assert!(text.starts_with(&header), "{text}");
        assert!(text.contains("File size : 2.00 KB\n"));
        assert!(text.contains("Modified : 02/11/2023 14:30:00\n"));
        assert!(text.contains("Dimensions : 640 x 480 pixels\n"));
        assert!(text.contains("Resolution : Not specified\n"));
        assert!(text.ends_with("No EXIF metadata found\n"));
    }

    #[test]
    fn gps_entry_is_split_into_two_lines() {
        let mut exif = BTreeMap::new();
        exif.insert(String::from("Make"), ExifValue::Text(String::from("Canon")));
        exif.insert(
            GPS_TAG.to_string(),
            ExifValue::Gps(GpsCoordinate::new(-33.86, 151.2)),
        );

        let text = render_report(&record(exif, Some(Resolution { x: 72.0, y: 72.0 })));

        assert!(text.contains("Resolution : 72 x 72 dpi\n"));
        assert!(text.contains("GPS Latitude : -33.86\nGPS Longitude : 151.2\n"));
        assert!(text.contains("Make: Canon\n"));
        assert!(!text.contains("No EXIF metadata found"));
    }

    #[test]
    fn map_link() {
        assert_eq!(
            maps_url(&GpsCoordinate::new(48.875, -2.5)),
            "https://www.google.com/maps?q=48.875,-2.5"
        );
    }
}
