use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};

use crate::models::{ExifValue, GpsCoordinate};

/// Key of the synthetic EXIF entry holding the decoded GPS position.
pub const GPS_TAG: &str = "GPS";

#[derive(Clone, Debug, PartialEq)]
pub struct FileInfo {
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
}

/// Dots per inch along each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} dpi", trim_dpi(self.x), trim_dpi(self.y))
    }
}

fn trim_dpi(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageInfo {
    pub format: String,
    pub color_mode: String,
    pub width: u32,
    pub height: u32,
    pub resolution: Option<Resolution>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRecord {
    pub file: FileInfo,
    pub image: ImageInfo,
    pub exif: BTreeMap<String, ExifValue>,
}

impl MetadataRecord {
    pub fn gps(&self) -> Option<GpsCoordinate> {
        self.exif.get(GPS_TAG).and_then(ExifValue::as_gps)
    }

    pub fn has_gps(&self) -> bool {
        self.gps().is_some()
    }

    pub fn exif_tag(&self, name: &str) -> Option<&ExifValue> {
        self.exif.get(name)
    }
}
