use std::collections::BTreeMap;

use exif::{Context, Field, Value};
use log::debug;

use crate::models::GpsCoordinate;

/// Convert DMS components to decimal degrees.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Converts a degrees/minutes/seconds triple, or returns `None` when the input
/// is not exactly three finite numbers.
pub fn to_decimal_degrees(components: &[f64]) -> Option<f64> {
    let [degrees, minutes, seconds] = components else {
        return None;
    };

    if !(degrees.is_finite() && minutes.is_finite() && seconds.is_finite()) {
        return None;
    }

    Some(dms_to_decimal(*degrees, *minutes, *seconds))
}

/// Coerces an EXIF value into floats. Text and opaque byte values are not numeric.
pub fn numeric_components(value: &Value) -> Option<Vec<f64>> {
    let components = match value {
        Value::Rational(v) => v.iter().map(|r| r.to_f64()).collect(),
        Value::SRational(v) => v.iter().map(|r| r.to_f64()).collect(),
        Value::Float(v) => v.iter().map(|f| f64::from(*f)).collect(),
        Value::Double(v) => v.clone(),
        Value::Short(v) => v.iter().map(|n| f64::from(*n)).collect(),
        Value::Long(v) => v.iter().map(|n| f64::from(*n)).collect(),
        Value::SShort(v) => v.iter().map(|n| f64::from(*n)).collect(),
        Value::SLong(v) => v.iter().map(|n| f64::from(*n)).collect(),
        Value::Byte(v) => v.iter().map(|n| f64::from(*n)).collect(),
        Value::SByte(v) => v.iter().map(|n| f64::from(*n)).collect(),
        _ => return None,
    };
    Some(components)
}

/// Negates `magnitude` when `reference` is the negative hemisphere letter.
pub fn apply_hemisphere(magnitude: f64, reference: Option<&str>, negative: &str) -> f64 {
    match reference {
        Some(letter) if letter == negative => -magnitude,
        _ => magnitude,
    }
}

pub fn signed_latitude(magnitude: f64, reference: Option<&str>) -> f64 {
    apply_hemisphere(magnitude, reference, "S")
}

pub fn signed_longitude(magnitude: f64, reference: Option<&str>) -> f64 {
    apply_hemisphere(magnitude, reference, "W")
}

/// The nested GPS IFD, keyed by GPS tag name.
#[derive(Debug, Default)]
pub struct GpsGroup<'a> {
    values: BTreeMap<String, &'a Value>,
}

impl<'a> GpsGroup<'a> {
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a Field>,
    {
        let values = fields
            .into_iter()
            .filter(|field| field.tag.context() == Context::Gps)
            .map(|field| (field.tag.to_string(), &field.value))
            .collect();

        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn coordinate(&self) -> Option<GpsCoordinate> {
        let latitude = self.axis("GPSLatitude")?;
        let longitude = self.axis("GPSLongitude")?;

        let latitude = signed_latitude(latitude, self.reference("GPSLatitudeRef").as_deref());
        let longitude = signed_longitude(longitude, self.reference("GPSLongitudeRef").as_deref());

        Some(GpsCoordinate::new(latitude, longitude))
    }

    fn axis(&self, name: &str) -> Option<f64> {
        let value = self.values.get(name)?;
        let converted = numeric_components(value).and_then(|parts| to_decimal_degrees(&parts));
        if converted.is_none() {
            debug!("{name} is not a degrees/minutes/seconds triple: {value:?}");
        }
        converted
    }

    fn reference(&self, name: &str) -> Option<String> {
        match self.values.get(name)? {
            Value::Ascii(parts) => parts.first().map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            }),
            _ => None,
        }
    }
}
