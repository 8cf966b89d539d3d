//! FITS file I/O for single-HDU astronomical frames
//!
//! Block layout, card encoding and the big-endian data unit are handled by
//! `fitsio`; this module maps the primary HDU to [`RawImage`] and its cards
//! to a [`Header`]. Extensions after the primary HDU are ignored.
//!
//! Axis order follows the file: `NAXIS1` is the fastest-varying (last)
//! ndarray axis, so a `NAXIS1 x NAXIS2 x NAXIS3` cube decodes to an array of
//! shape `(NAXIS3, NAXIS2, NAXIS1)`. Rows are not flipped, which keeps pixel
//! coordinates stored in the header valid as ndarray indices.

use super::FormatAdapter;
use crate::header::{Card, Header, HeaderValue};
use crate::normalize::RawImage;
use fitsio::hdu::{parse_fits as parse_hdus, Hdu, HduInfo};
use fitsio::header::{serialize_header, Card as FitsCard};
use fitsio::image::{
    apply_bscale_bzero, extract_bscale_bzero, read_image_data, serialize_image, ImageData,
};
use fitsio::primary::build_primary_header;
use fitsio::value::Value;
use ndarray::{ArrayD, IxDyn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const KEYWORD_LEN: usize = 8;
const UNSIGNED_16_BZERO: f64 = 32768.0;

/// Errors that can occur during FITS file operations
#[derive(Error, Debug)]
pub enum FitsError {
    #[error("FITS I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("FITS format error: {0}")]
    Format(#[from] fitsio::Error),
    #[error("Primary HDU holds no image data")]
    NoImageData,
    #[error("Cannot reshape data unit to {0:?}")]
    InvalidShape(Vec<usize>),
    #[error("Cannot write card {key}: {reason}")]
    InvalidCard { key: String, reason: String },
}

/// The primary-HDU FITS codec
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsCodec;

impl FormatAdapter for FitsCodec {
    fn open_for_read(&self, path: &Path) -> Result<(RawImage, Header), FitsError> {
        read_fits(path)
    }

    fn write(
        &self,
        raw: &RawImage,
        header: &Header,
        path: &Path,
        overwrite: bool,
    ) -> Result<(), FitsError> {
        write_fits(raw, header, path, overwrite)
    }

    fn read_header_only(&self, path: &Path) -> Result<Header, FitsError> {
        read_fits_header(path)
    }
}

/// Read the primary HDU of a FITS file
pub fn read_fits<P: AsRef<Path>>(path: P) -> Result<(RawImage, Header), FitsError> {
    let path = path.as_ref();
    info!("Opening {}...", path.display());
    let bytes = fs::read(path)?;
    parse_fits(&bytes)
}

/// Read only the primary header; the data unit is never decoded
pub fn read_fits_header<P: AsRef<Path>>(path: P) -> Result<Header, FitsError> {
    let bytes = fs::read(path)?;
    let hdu = primary_hdu(&bytes)?;
    Ok(header_from_cards(&hdu.cards))
}

/// Write a primary HDU, building the whole file in memory before touching disk
pub fn write_fits<P: AsRef<Path>>(
    raw: &RawImage,
    header: &Header,
    path: P,
    overwrite: bool,
) -> Result<(), FitsError> {
    let path = path.as_ref();
    info!("Saving to {}...", path.display());
    let bytes = serialize_fits(raw, header)?;

    if overwrite {
        fs::write(path, bytes)?;
    } else {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(&bytes)?;
    }

    Ok(())
}

/// Decode a FITS byte stream
///
/// BITPIX 16 with `BZERO = 32768, BSCALE = 1` decodes as unsigned 16-bit.
/// Any other non-trivial scaling decodes to physical `f64` values.
/// `BZERO`/`BSCALE` are dropped from the returned header since the samples
/// are physical.
pub fn parse_fits(bytes: &[u8]) -> Result<(RawImage, Header), FitsError> {
    let hdu = primary_hdu(bytes)?;
    let (bitpix, naxes) = match &hdu.info {
        HduInfo::Primary { bitpix, naxes } => (*bitpix, naxes.as_slice()),
        _ => return Err(FitsError::NoImageData),
    };
    if naxes.is_empty() {
        return Err(FitsError::NoImageData);
    }

    let shape: Vec<usize> = naxes.iter().rev().copied().collect();
    let (bscale, bzero) = extract_bscale_bzero(&hdu.cards);
    let data = read_image_data(bytes, &hdu)?;
    let raw = to_raw(data, &shape, bscale, bzero)?;

    debug!(
        "Decoded primary HDU: BITPIX={} shape={:?} as {}",
        bitpix,
        shape,
        raw.encoding()
    );
    Ok((raw, header_from_cards(&hdu.cards)))
}

/// Encode a primary HDU
///
/// Structural keywords (SIMPLE, BITPIX, NAXISn and the unsigned 16-bit
/// BZERO/BSCALE pair) are regenerated from `raw`; every other card of
/// `header` follows in order, then its COMMENT/HISTORY lines.
pub fn serialize_fits(raw: &RawImage, header: &Header) -> Result<Vec<u8>, FitsError> {
    let naxes: Vec<usize> = raw.shape().iter().rev().copied().collect();
    let mut cards = build_primary_header(raw.bitpix(), &naxes)?;

    if let RawImage::U16(_) = raw {
        cards.push(fits_card("BZERO", Value::Float(UNSIGNED_16_BZERO), None)?);
        cards.push(fits_card("BSCALE", Value::Float(1.0), None)?);
    }
    for card in header.cards().iter().filter(|card| !is_structural(&card.key)) {
        let value = to_value(&card.key, &card.value)?;
        cards.push(fits_card(&card.key, value, card.comment.clone())?);
    }
    for (keyword, text) in header.commentary() {
        cards.push(FitsCard {
            keyword: keyword_bytes(keyword)?,
            value: None,
            comment: Some(text.clone()),
        });
    }

    let mut bytes = serialize_header(&cards)?;
    bytes.extend(serialize_image(&to_image_data(raw)));
    Ok(bytes)
}

fn primary_hdu(bytes: &[u8]) -> Result<Hdu, FitsError> {
    parse_hdus(bytes)?
        .hdus
        .into_iter()
        .next()
        .ok_or(FitsError::NoImageData)
}

fn is_structural(key: &str) -> bool {
    match key {
        "SIMPLE" | "BITPIX" | "NAXIS" | "BZERO" | "BSCALE" | "EXTEND" | "END" => true,
        _ => key
            .strip_prefix("NAXIS")
            .is_some_and(|axis| !axis.is_empty() && axis.bytes().all(|b| b.is_ascii_digit())),
    }
}

fn is_scaling(key: &str) -> bool {
    key == "BSCALE" || key == "BZERO"
}

// Cards

fn header_from_cards(cards: &[FitsCard]) -> Header {
    let mut header = Header::new();

    for card in cards {
        let key = card.keyword_str().trim_end();
        if key == "END" || is_scaling(key) {
            continue;
        }
        match &card.value {
            Some(value) => header.push_card(Card {
                key: key.to_string(),
                value: from_value(value),
                comment: card
                    .comment
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            }),
            None => {
                let text = card.comment.as_deref().unwrap_or_default().trim_end();
                if !key.is_empty() || !text.is_empty() {
                    header.push_commentary(key, text);
                }
            }
        }
    }

    header
}

fn from_value(value: &Value) -> HeaderValue {
    match value {
        Value::Logical(b) => HeaderValue::Bool(*b),
        Value::Integer(i) => HeaderValue::Integer(*i),
        Value::Float(f) => HeaderValue::Float(*f),
        Value::String(s) => HeaderValue::Str(s.trim_end().to_string()),
        other => HeaderValue::Str(format!("{other:?}")),
    }
}

fn to_value(key: &str, value: &HeaderValue) -> Result<Value, FitsError> {
    Ok(match value {
        HeaderValue::Bool(b) => Value::Logical(*b),
        HeaderValue::Integer(i) => Value::Integer(*i),
        HeaderValue::Float(f) if f.is_finite() => Value::Float(*f),
        HeaderValue::Float(f) => {
            return Err(FitsError::InvalidCard {
                key: key.to_string(),
                reason: format!("non-finite value {f}"),
            })
        }
        HeaderValue::Str(s) if s.is_ascii() => Value::String(s.clone()),
        HeaderValue::Str(_) => {
            return Err(FitsError::InvalidCard {
                key: key.to_string(),
                reason: "non-ASCII text".to_string(),
            })
        }
    })
}

fn keyword_bytes(key: &str) -> Result<[u8; KEYWORD_LEN], FitsError> {
    if key.len() > KEYWORD_LEN || !key.is_ascii() {
        return Err(FitsError::InvalidCard {
            key: key.to_string(),
            reason: "keyword must be at most 8 ASCII characters".to_string(),
        });
    }
    let mut keyword = [b' '; KEYWORD_LEN];
    keyword[..key.len()].copy_from_slice(key.as_bytes());
    Ok(keyword)
}

fn fits_card(key: &str, value: Value, comment: Option<String>) -> Result<FitsCard, FitsError> {
    Ok(FitsCard {
        keyword: keyword_bytes(key)?,
        value: Some(value),
        comment,
    })
}

// Data unit

fn to_array<T>(shape: &[usize], samples: Vec<T>) -> Result<ArrayD<T>, FitsError> {
    ArrayD::from_shape_vec(IxDyn(shape), samples)
        .map_err(|_| FitsError::InvalidShape(shape.to_vec()))
}

fn to_raw(
    data: ImageData,
    shape: &[usize],
    bscale: f64,
    bzero: f64,
) -> Result<RawImage, FitsError> {
    if bscale == 1.0 && bzero == UNSIGNED_16_BZERO {
        if let ImageData::I16(samples) = data {
            let unsigned: Vec<u16> = samples.iter().map(|&v| (v as u16) ^ 0x8000).collect();
            return Ok(RawImage::U16(to_array(shape, unsigned)?));
        }
    }
    if bscale != 1.0 || bzero != 0.0 {
        let physical = apply_bscale_bzero(&data, bscale, bzero);
        return Ok(RawImage::F64(to_array(shape, physical)?));
    }

    Ok(match data {
        ImageData::U8(v) => RawImage::U8(to_array(shape, v)?),
        ImageData::I16(v) => RawImage::I16(to_array(shape, v)?),
        ImageData::I32(v) => RawImage::I32(to_array(shape, v)?),
        ImageData::I64(v) => RawImage::I64(to_array(shape, v)?),
        ImageData::F32(v) => RawImage::F32(to_array(shape, v)?),
        ImageData::F64(v) => RawImage::F64(to_array(shape, v)?),
    })
}

fn to_image_data(raw: &RawImage) -> ImageData {
    match raw {
        RawImage::U8(a) => ImageData::U8(a.iter().copied().collect()),
        RawImage::I16(a) => ImageData::I16(a.iter().copied().collect()),
        RawImage::U16(a) => ImageData::I16(a.iter().map(|&v| (v ^ 0x8000) as i16).collect()),
        RawImage::I32(a) => ImageData::I32(a.iter().copied().collect()),
        RawImage::I64(a) => ImageData::I64(a.iter().copied().collect()),
        RawImage::F32(a) => ImageData::F32(a.iter().copied().collect()),
        RawImage::F64(a) => ImageData::F64(a.iter().copied().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, Array3};
    use tempfile::{NamedTempFile, TempDir};

    /// Header cards plus a raw big-endian data unit, padded to whole blocks
    fn build_file(cards: &[FitsCard], data: &[u8]) -> Vec<u8> {
        let mut bytes = serialize_header(cards).unwrap();
        let padded = data.len().div_ceil(2880) * 2880;
        let start = bytes.len();
        bytes.resize(start + padded, 0);
        bytes[start..start + data.len()].copy_from_slice(data);
        bytes
    }

    #[test]
    fn test_fits_error_display() {
        let error = FitsError::InvalidShape(vec![3, 4]);
        assert!(error.to_string().contains("Cannot reshape data unit to [3, 4]"));

        let error = FitsError::InvalidCard {
            key: "BAD".to_string(),
            reason: "non-finite value NaN".to_string(),
        };
        assert!(error.to_string().contains("Cannot write card BAD"));
    }

    #[test]
    fn test_uint16_roundtrip_in_memory() {
        let mut array = Array2::<u16>::zeros((3, 4));
        array[[1, 2]] = 32768;
        array[[2, 3]] = 65535;
        let raw = RawImage::U16(array.into_dyn());

        let bytes = serialize_fits(&raw, &Header::new()).unwrap();
        assert_eq!(bytes.len() % 2880, 0);

        let (decoded, header) = parse_fits(&bytes).unwrap();
        assert_eq!(decoded, raw);
        assert!(!header.contains_key("BZERO"));
        assert_eq!(header.get("BITPIX"), Some(&HeaderValue::Integer(16)));
        assert_eq!(header.get("NAXIS1"), Some(&HeaderValue::Integer(4)));
        assert_eq!(header.get("NAXIS2"), Some(&HeaderValue::Integer(3)));
    }

    #[test]
    fn test_cube_axis_order() {
        let cube = Array3::from_shape_fn((3, 2, 4), |(c, r, x)| (c * 100 + r * 10 + x) as f32);
        let raw = RawImage::F32(cube.into_dyn());

        let (decoded, header) = parse_fits(&serialize_fits(&raw, &Header::new()).unwrap()).unwrap();
        assert_eq!(header.get("NAXIS1"), Some(&HeaderValue::Integer(4)));
        assert_eq!(header.get("NAXIS3"), Some(&HeaderValue::Integer(3)));
        assert_eq!(decoded.shape(), &[3, 2, 4]);
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_header_values_roundtrip() {
        let mut header = Header::new();
        header.set_with_comment("EXPTIME", 10.5, "seconds");
        header.set("OBJECT", "O'Brien field");
        header.set("GAIN", 120);
        header.set("COOLED", true);
        header.set("TINY", 1.0e-7);
        header.push_commentary("HISTORY", "pedestal removed");

        let raw = RawImage::F64(Array2::<f64>::zeros((2, 2)).into_dyn());
        let (_, decoded) = parse_fits(&serialize_fits(&raw, &header).unwrap()).unwrap();

        let card = decoded.get_card("EXPTIME").unwrap();
        assert_eq!(card.value, HeaderValue::Float(10.5));
        assert_eq!(card.comment.as_deref(), Some("seconds"));
        assert_eq!(decoded.get("OBJECT"), Some(&HeaderValue::Str("O'Brien field".into())));
        assert_eq!(decoded.get("GAIN"), Some(&HeaderValue::Integer(120)));
        assert_eq!(decoded.get("COOLED"), Some(&HeaderValue::Bool(true)));
        assert_relative_eq!(decoded.get("TINY").unwrap().as_f64().unwrap(), 1.0e-7);
        assert!(decoded
            .commentary()
            .iter()
            .any(|(key, text)| key == "HISTORY" && text.trim() == "pedestal removed"));
    }

    #[test]
    fn test_structural_keys_are_regenerated() {
        let mut header = Header::new();
        header.set("NAXIS1", 999);
        header.set("BITPIX", 8);
        header.set("OBSERVER", "night");

        let raw = RawImage::F64(Array2::<f64>::zeros((2, 3)).into_dyn());
        let (_, decoded) = parse_fits(&serialize_fits(&raw, &header).unwrap()).unwrap();

        assert_eq!(decoded.get("NAXIS1"), Some(&HeaderValue::Integer(3)));
        assert_eq!(decoded.get("BITPIX"), Some(&HeaderValue::Integer(-64)));
        assert_eq!(decoded.keys().last(), Some("OBSERVER"));
    }

    #[test]
    fn test_scaled_integers_decode_to_physical() {
        let mut cards = build_primary_header(16, &[2]).unwrap();
        cards.push(fits_card("BSCALE", Value::Float(0.5), None).unwrap());
        cards.push(fits_card("BZERO", Value::Float(10.0), None).unwrap());
        let mut data = 4i16.to_be_bytes().to_vec();
        data.extend_from_slice(&(-2i16).to_be_bytes());

        let (raw, header) = parse_fits(&build_file(&cards, &data)).unwrap();
        assert!(!header.contains_key("BSCALE"));
        match raw {
            RawImage::F64(a) => assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![12.0, 9.0]),
            other => panic!("expected physical floats, got {:?}", other.encoding()),
        }
    }

    #[test]
    fn test_oversized_axes_are_an_error() {
        let cards = build_primary_header(16, &[100_000, 100_000]).unwrap();
        let bytes = build_file(&cards, &[0u8; 64]);

        assert!(parse_fits(&bytes).is_err());
    }

    #[test]
    fn test_truncated_data_unit() {
        let raw = RawImage::F64(Array2::<f64>::zeros((40, 40)).into_dyn());
        let bytes = serialize_fits(&raw, &Header::new()).unwrap();

        assert!(parse_fits(&bytes[..2880 * 2]).is_err());
    }

    #[test]
    fn test_not_a_fits_stream() {
        assert!(matches!(
            parse_fits(&[b' '; 2880]),
            Err(FitsError::Format(_) | FitsError::NoImageData)
        ));
    }

    #[test]
    fn test_header_only_image_has_no_data() {
        let cards = build_primary_header(8, &[]).unwrap();
        let bytes = build_file(&cards, &[]);
        assert!(matches!(parse_fits(&bytes), Err(FitsError::NoImageData)));
    }

    #[test]
    fn test_rejects_long_keyword_and_nan() {
        let raw = RawImage::U8(Array2::<u8>::zeros((1, 1)).into_dyn());

        let header: Header = [("LONGKEYWORD", 1)].into_iter().collect();
        assert!(matches!(
            serialize_fits(&raw, &header),
            Err(FitsError::InvalidCard { .. })
        ));

        let header: Header = [("BAD", f64::NAN)].into_iter().collect();
        assert!(matches!(
            serialize_fits(&raw, &header),
            Err(FitsError::InvalidCard { .. })
        ));
    }

    #[test]
    fn test_file_roundtrip_and_header_only() {
        let temp = NamedTempFile::new().unwrap();
        let header: Header = [("EXPTIME", 30)].into_iter().collect();
        let raw = RawImage::U16(Array2::<u16>::from_elem((10, 20), 1234).into_dyn());

        FitsCodec.write(&raw, &header, temp.path(), true).unwrap();
        let (decoded, read_header) = FitsCodec.open_for_read(temp.path()).unwrap();
        let header_only = FitsCodec.read_header_only(temp.path()).unwrap();

        assert_eq!(decoded, raw);
        assert_eq!(read_header, header_only);
        assert_eq!(header_only.get("EXPTIME"), Some(&HeaderValue::Integer(30)));
    }

    #[test]
    fn test_no_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.fits");
        let raw = RawImage::U8(Array2::<u8>::zeros((2, 2)).into_dyn());

        write_fits(&raw, &Header::new(), &path, false).unwrap();
        let err = write_fits(&raw, &Header::new(), &path, false).unwrap_err();
        let FitsError::Io(e) = &err else {
            panic!("expected an I/O error, got {err}");
        };
        assert_eq!(e.kind(), std::io::ErrorKind::AlreadyExists);
        write_fits(&raw, &Header::new(), &path, true).unwrap();
    }
}
