use std::fmt;

use serde::{Deserialize, Serialize};

/// Signed decimal degrees. Southern latitudes and western longitudes are negative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GpsCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExifValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Gps(GpsCoordinate),
}

impl ExifValue {
    pub fn as_gps(&self) -> Option<GpsCoordinate> {
        match self {
            Self::Gps(coordinate) => Some(*coordinate),
            _ => None,
        }
    }
}

impl fmt::Display for ExifValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Gps(coordinate) => write!(f, "{coordinate}"),
        }
    }
}
