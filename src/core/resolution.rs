use std::io::{self, Read, Seek, SeekFrom};

use exif::{In, Tag};

use crate::models::Resolution;

const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";
const CM_PER_INCH: f64 = 2.54;
const METRES_PER_INCH: f64 = 0.0254;

/// Looks for a physical resolution in the container header first, then in EXIF.
///
/// Segments and chunks are skipped with seeks, so large ICC profiles or
/// thumbnails ahead of the density record cost nothing to step over.
pub fn detect<R: Read + Seek>(reader: &mut R, exif: Option<&exif::Exif>) -> Option<Resolution> {
    jfif_density(reader)
        .or_else(|| png_physical_size(reader))
        .or_else(|| exif.and_then(exif_resolution))
}

/// Density from a JFIF APP0 segment (unit 1 = dots/inch, unit 2 = dots/cm).
pub fn jfif_density<R: Read + Seek>(reader: &mut R) -> Option<Resolution> {
    reader.rewind().ok()?;
    if read_array::<2>(reader).ok()? != [0xFF, 0xD8] {
        return None;
    }

    loop {
        let [prefix, marker, hi, lo] = read_array::<4>(reader).ok()?;
        // Start of scan: the header segments are over.
        if prefix != 0xFF || marker == 0xDA {
            return None;
        }

        let body_len = i64::from(u16::from_be_bytes([hi, lo])) - 2;
        if body_len < 0 {
            return None;
        }

        if marker == 0xE0 && body_len >= 12 {
            let body = read_array::<12>(reader).ok()?;
            if &body[..5] == b"JFIF\0" {
                let x = u16::from_be_bytes([body[8], body[9]]);
                let y = u16::from_be_bytes([body[10], body[11]]);
                return scale(f64::from(x), f64::from(y), match body[7] {
                    1 => Some(1.0),
                    2 => Some(CM_PER_INCH),
                    _ => None,
                });
            }
            reader.seek(SeekFrom::Current(body_len - 12)).ok()?;
        } else {
            reader.seek(SeekFrom::Current(body_len)).ok()?;
        }
    }
}

/// Density from a PNG `pHYs` chunk (unit 1 = pixels per metre).
pub fn png_physical_size<R: Read + Seek>(reader: &mut R) -> Option<Resolution> {
    reader.rewind().ok()?;
    if read_array::<8>(reader).ok()? != PNG_SIGNATURE {
        return None;
    }

    loop {
        let head = read_array::<8>(reader).ok()?;
        let chunk_len = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);

        match &head[4..] {
            b"pHYs" if chunk_len >= 9 => {
                let body = read_array::<9>(reader).ok()?;
                if body[8] != 1 {
                    return None;
                }
                let x = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                let y = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                let dpi_x = (f64::from(x) * METRES_PER_INCH).round();
                let dpi_y = (f64::from(y) * METRES_PER_INCH).round();
                return scale(dpi_x, dpi_y, Some(1.0));
            }
            b"IDAT" | b"IEND" => return None,
            // Chunk data plus its CRC.
            _ => reader.seek(SeekFrom::Current(i64::from(chunk_len) + 4)).ok()?,
        };
    }
}

/// `XResolution`/`YResolution` of the primary image, honouring `ResolutionUnit`.
pub fn exif_resolution(exif: &exif::Exif) -> Option<Resolution> {
    let x = exif
        .get_field(Tag::XResolution, In::PRIMARY)
        .and_then(|field| first_float(&field.value))?;
    let y = exif
        .get_field(Tag::YResolution, In::PRIMARY)
        .and_then(|field| first_float(&field.value))
        .unwrap_or(x);

    // EXIF defaults to inches when the unit tag is missing.
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(2);

    scale(x, y, match unit {
        2 => Some(1.0),
        3 => Some(CM_PER_INCH),
        _ => None,
    })
}

fn first_float(value: &exif::Value) -> Option<f64> {
    match value {
        exif::Value::Rational(v) => v.first().map(|r| r.to_f64()),
        exif::Value::SRational(v) => v.first().map(|r| r.to_f64()),
        other => other.get_uint(0).map(f64::from),
    }
}

fn scale(x: f64, y: f64, factor: Option<f64>) -> Option<Resolution> {
    let factor = factor?;
    if !(x.is_finite() && y.is_finite()) || x <= 0.0 || y <= 0.0 {
        return None;
    }

    Some(Resolution {
        x: x * factor,
        y: y * factor,
    })
}

fn read_array<const N: usize>(reader: &mut impl Read) -> io::Result<[u8; N]> {
    let mut buf = [0; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn jfif(data: Vec<u8>) -> Option<Resolution> {
        jfif_density(&mut Cursor::new(data))
    }

    fn png(data: Vec<u8>) -> Option<Resolution> {
        png_physical_size(&mut Cursor::new(data))
    }

    fn jfif_header(unit: u8, x: u16, y: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[1, 1, unit]);
        data.extend_from_slice(&x.to_be_bytes());
        data.extend_from_slice(&y.to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        data
    }

    fn png_header(ppm_x: u32, ppm_y: u32, unit: u8) -> Vec<u8> {
        png_header_after(&[], ppm_x, ppm_y, unit)
    }

    /// PNG whose `pHYs` follows an extra `zTXt` chunk carrying `filler`.
    fn png_header_after(filler: &[u8], ppm_x: u32, ppm_y: u32, unit: u8) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&[0; 13]);
        data.extend_from_slice(&[0; 4]);
        if !filler.is_empty() {
            data.extend_from_slice(&(filler.len() as u32).to_be_bytes());
            data.extend_from_slice(b"zTXt");
            data.extend_from_slice(filler);
            data.extend_from_slice(&[0; 4]);
        }
        data.extend_from_slice(&9u32.to_be_bytes());
        data.extend_from_slice(b"pHYs");
        data.extend_from_slice(&ppm_x.to_be_bytes());
        data.extend_from_slice(&ppm_y.to_be_bytes());
        data.push(unit);
        data.extend_from_slice(&[0; 4]);
        data
    }

    #[test]
    fn jfif_inch_density() {
        assert_eq!(
            jfif(jfif_header(1, 300, 240)),
            Some(Resolution { x: 300.0, y: 240.0 })
        );
    }

    #[test]
    fn jfif_centimetre_density_is_converted() {
        let resolution = jfif(jfif_header(2, 100, 100)).expect("dots per cm converts");
        assert!((resolution.x - 254.0).abs() < 1e-9);
    }

    #[test]
    fn jfif_aspect_ratio_only_has_no_dpi() {
        assert_eq!(jfif(jfif_header(0, 1, 1)), None);
    }

    #[test]
    fn png_pixels_per_metre() {
        assert_eq!(
            png(png_header(2835, 2835, 1)),
            Some(Resolution { x: 72.0, y: 72.0 })
        );
        assert_eq!(png(png_header(2835, 2835, 0)), None);
    }

    #[test]
    fn unrelated_bytes_have_no_resolution() {
        assert_eq!(detect(&mut Cursor::new(b"GIF89a...."), None), None);
        assert_eq!(detect(&mut Cursor::new(Vec::new()), None), None);
    }

    #[test]
    fn density_after_large_segments_is_found() {
        let filler = vec![0x20; 200 * 1024];

        // Oversized APP2 segments ahead of APP0, as ICC profiles are split.
        let mut jpeg = vec![0xFF, 0xD8];
        for chunk in filler.chunks(60_000) {
            jpeg.extend_from_slice(&[0xFF, 0xE2]);
            jpeg.extend_from_slice(&((chunk.len() + 2) as u16).to_be_bytes());
            jpeg.extend_from_slice(chunk);
        }
        jpeg.extend_from_slice(&jfif_header(1, 300, 300)[2..]);
        assert_eq!(jfif(jpeg), Some(Resolution { x: 300.0, y: 300.0 }));

        assert_eq!(
            png(png_header_after(&filler, 11811, 11811, 1)),
            Some(Resolution { x: 300.0, y: 300.0 })
        );
    }

    #[test]
    fn truncated_segments_have_no_resolution() {
        let mut jpeg = jfif_header(1, 300, 300);
        jpeg.truncate(10);
        assert_eq!(jfif(jpeg), None);

        let mut data = png_header(2835, 2835, 1);
        data.truncate(data.len() - 8);
        assert_eq!(png(data), None);
    }
}
