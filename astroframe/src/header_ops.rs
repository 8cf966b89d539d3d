//! Pure operations over [`Header`]s.
//!
//! Everything here returns a fresh header except [`remove_keys`], which is
//! the explicit in-place deletion.

use crate::error::{FrameError, Result};
use crate::header::{default_feature_keys, keys, Card, FeatureKey, Header, HeaderValue};
use crate::image::PixelShape;

/// Copy the cards for `keys`, in the requested order.
///
/// Fails with `MissingKey` on the first key the header lacks.
pub fn extract_subset(header: &Header, keys: &[&str]) -> Result<Header> {
    let mut subset = Header::new();
    for key in keys {
        let card = header
            .get_card(key)
            .ok_or_else(|| FrameError::MissingKey(key.to_ascii_uppercase()))?;
        subset.push_card(card.clone());
    }
    Ok(subset)
}

/// Union of two headers where `overrides` wins on shared keys.
///
/// Keys of `base` keep their order; keys only in `overrides` are appended in
/// its order. An override without a comment keeps the base card's comment.
/// Commentary lines of `base` come before those of `overrides`.
pub fn merge(base: &Header, overrides: &Header) -> Header {
    let mut merged = base.clone();

    for card in overrides.cards() {
        let comment = card.comment.clone().or_else(|| {
            merged
                .get_card(&card.key)
                .and_then(|existing| existing.comment.clone())
        });
        merged.push_card(Card {
            key: card.key.clone(),
            value: card.value.clone(),
            comment,
        });
    }
    for (keyword, text) in overrides.commentary() {
        merged.push_commentary(keyword, text);
    }

    merged
}

/// Delete `keys` in place, returning how many were present
pub fn remove_keys(header: &mut Header, keys: &[&str]) -> usize {
    keys.iter()
        .filter_map(|key| header.remove(key))
        .count()
}

/// Re-express the moon and sun tracker coordinates relative to a new origin
/// `(dx, dy)`.
pub fn translate_crop_coordinates(header: &Header, dx: i64, dy: i64) -> Result<Header> {
    translate_feature_coordinates(header, &default_feature_keys(), dx, dy)
}

/// Subtract `dx` from every X key and `dy` from every Y key of `features`.
///
/// Keys absent from the header are skipped. Integer values stay integers and
/// float values stay floats; any other value is `NonNumericKey`.
pub fn translate_feature_coordinates(
    header: &Header,
    features: &[FeatureKey],
    dx: i64,
    dy: i64,
) -> Result<Header> {
    let mut translated = header.clone();
    for feature in features {
        shift_value(&mut translated, &feature.x, dx)?;
        shift_value(&mut translated, &feature.y, dy)?;
    }
    Ok(translated)
}

fn shift_value(header: &mut Header, key: &str, delta: i64) -> Result<()> {
    let shifted = match header.get(key) {
        None => return Ok(()),
        Some(HeaderValue::Integer(v)) => HeaderValue::Integer(v - delta),
        Some(HeaderValue::Float(v)) => HeaderValue::Float(v - delta as f64),
        Some(_) => return Err(FrameError::NonNumericKey(key.to_ascii_uppercase())),
    };
    header.set(key, shifted);
    Ok(())
}

/// Rewrite `NAXIS1`/`NAXIS2` to match a frame of `shape`
pub fn set_dimensions(header: &mut Header, shape: PixelShape) {
    header.set(keys::NAXIS1, shape.width);
    header.set(keys::NAXIS2, shape.height);
}
