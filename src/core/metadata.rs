use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use exif::{Context, Exif, Field, In, Tag, Value};
use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use log::{debug, info, warn};
use thiserror::Error;

use crate::core::gps::GpsGroup;
use crate::core::resolution;
use crate::models::{ExifValue, FileInfo, ImageInfo, MetadataRecord, GPS_TAG};

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB"];
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not a readable image: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl MetadataError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn decode(path: &Path, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Failures reading the EXIF block. These never reach the caller of `extract`.
#[derive(Debug, Error)]
enum ExifReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Exif(#[from] exif::Error),
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn extract(path: &Path) -> Result<MetadataRecord> {
        let file = Self::read_file_info(path)?;
        let (mut image, format) = Self::read_image_info(path)?;

        let exif = if supports_exif(format) {
            match Self::read_exif(path) {
                Ok(exif) => exif,
                Err(err) => {
                    warn!(
                        "EXIF block of {} is unreadable, continuing without it: {err}",
                        path.display()
                    );
                    None
                }
            }
        } else {
            None
        };

        let mut reader = File::open(path)
            .map(BufReader::new)
            .map_err(|err| MetadataError::io(path, err))?;
        image.resolution = resolution::detect(&mut reader, exif.as_ref());
        if image.resolution.is_none() {
            debug!("{} declares no physical resolution", path.display());
        }

        let exif = exif.as_ref().map(exif_entries).unwrap_or_default();

        info!(
            "extracted {} ({}, {}x{}, {} EXIF entries)",
            file.filename,
            image.format,
            image.width,
            image.height,
            exif.len()
        );

        Ok(MetadataRecord { file, image, exif })
    }

    fn read_file_info(path: &Path) -> Result<FileInfo> {
        let meta = fs::metadata(path).map_err(|err| MetadataError::io(path, err))?;
        let modified: DateTime<Local> = meta
            .modified()
            .map(DateTime::from)
            .map_err(|err| MetadataError::io(path, err))?;
        let created = meta
            .created()
            .ok()
            .map(DateTime::<Local>::from)
            .or_else(|| change_time(&meta))
            .unwrap_or(modified);

        let absolute = fs::canonicalize(path).unwrap_or_else(|_| {
            std::env::current_dir()
                .map(|dir| dir.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        });

        Ok(FileInfo {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| String::from("unknown")),
            path: absolute.display().to_string(),
            size: meta.len(),
            created,
            modified,
        })
    }

    fn read_image_info(path: &Path) -> Result<(ImageInfo, Option<ImageFormat>)> {
        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| MetadataError::io(path, err))?;

        let format = reader.format();
        let decoder = reader
            .into_decoder()
            .map_err(|err| MetadataError::decode(path, err))?;
        let (width, height) = decoder.dimensions();

        let info = ImageInfo {
            format: format
                .map(format_name)
                .unwrap_or_else(|| String::from("Unknown")),
            color_mode: color_mode(decoder.color_type()),
            width,
            height,
            resolution: None,
        };

        Ok((info, format))
    }

    fn read_exif(path: &Path) -> std::result::Result<Option<Exif>, ExifReadError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(Some(exif)),
            Err(exif::Error::NotFound(_)) => {
                debug!("{} carries no EXIF block", path.display());
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Human-readable size with base-1024 steps and two decimals.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn exif_entries(exif: &Exif) -> BTreeMap<String, ExifValue> {
    let primary = || exif.fields().filter(|field| field.ifd_num == In::PRIMARY);

    let mut entries: BTreeMap<String, ExifValue> = primary()
        .filter(|field| matches!(field.tag.context(), Context::Tiff | Context::Exif))
        .filter(|field| !is_ifd_pointer(field.tag))
        .map(|field| (tag_name(field.tag), decode_field(field)))
        .collect();

    let gps = GpsGroup::from_fields(primary());
    if !gps.is_empty() {
        match gps.coordinate() {
            Some(coordinate) => {
                entries.insert(GPS_TAG.to_string(), ExifValue::Gps(coordinate));
            }
            None => debug!(
                "GPS group with {} fields has no usable coordinates, omitting it",
                gps.len()
            ),
        }
    }

    entries
}

/// Standard tag name, or the decimal tag number for tags outside the dictionary.
fn tag_name(tag: Tag) -> String {
    if tag.description().is_some() {
        tag.to_string()
    } else {
        tag.number().to_string()
    }
}

fn is_ifd_pointer(tag: Tag) -> bool {
    tag == Tag::ExifIFDPointer || tag == Tag::GPSInfoIFDPointer || tag == Tag::InteropIFDPointer
}

fn decode_field(field: &Field) -> ExifValue {
    match &field.value {
        Value::Ascii(parts) => ExifValue::Text(
            parts
                .iter()
                .map(|part| clean_text(part))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Byte(bytes) | Value::Undefined(bytes, _) => ExifValue::Text(clean_text(bytes)),
        Value::Short(v) if v.len() == 1 => ExifValue::Integer(i64::from(v[0])),
        Value::Long(v) if v.len() == 1 => ExifValue::Integer(i64::from(v[0])),
        Value::SByte(v) if v.len() == 1 => ExifValue::Integer(i64::from(v[0])),
        Value::SShort(v) if v.len() == 1 => ExifValue::Integer(i64::from(v[0])),
        Value::SLong(v) if v.len() == 1 => ExifValue::Integer(i64::from(v[0])),
        Value::Rational(v) if v.len() == 1 => float_or_text(v[0].to_f64(), field),
        Value::SRational(v) if v.len() == 1 => float_or_text(v[0].to_f64(), field),
        Value::Float(v) if v.len() == 1 => float_or_text(f64::from(v[0]), field),
        Value::Double(v) if v.len() == 1 => float_or_text(v[0], field),
        _ => ExifValue::Text(field.display_value().to_string()),
    }
}

// Zero denominators would otherwise leak NaN/inf into the record.
fn float_or_text(value: f64, field: &Field) -> ExifValue {
    if value.is_finite() {
        ExifValue::Float(value)
    } else {
        ExifValue::Text(field.display_value().to_string())
    }
}

fn clean_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn supports_exif(format: Option<ImageFormat>) -> bool {
    matches!(
        format,
        Some(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP | ImageFormat::Avif)
    )
}

fn format_name(format: ImageFormat) -> String {
    let name = match format {
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::Png => "PNG",
        ImageFormat::Gif => "GIF",
        ImageFormat::WebP => "WEBP",
        ImageFormat::Tiff => "TIFF",
        ImageFormat::Bmp => "BMP",
        ImageFormat::Ico => "ICO",
        ImageFormat::Avif => "AVIF",
        other => return format!("{other:?}").to_ascii_uppercase(),
    };
    name.to_string()
}

fn color_mode(color: ColorType) -> String {
    let mode = match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;F32",
        ColorType::Rgba32F => "RGBA;F32",
        other => return format!("{other:?}"),
    };
    mode.to_string()
}

#[cfg(unix)]
fn change_time(meta: &fs::Metadata) -> Option<DateTime<Local>> {
    use std::os::unix::fs::MetadataExt;

    DateTime::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32)
        .map(|utc| utc.with_timezone(&Local))
}

#[cfg(not(unix))]
fn change_time(_meta: &fs::Metadata) -> Option<DateTime<Local>> {
    None
}
