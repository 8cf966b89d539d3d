//! Ordered key/value header attached to every frame.
//!
//! Mirrors the primary-HDU header of a FITS file: keyed cards keep their
//! insertion order (so a decoded header is written back in the same order),
//! keys are matched case-insensitively and stored upper-case, and
//! COMMENT/HISTORY lines are carried separately as commentary.

use crate::error::{FrameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known header keys consumed or produced by the pipeline.
pub mod keys {
    /// Bias offset in 16-bit ADU, removed before tonal processing
    pub const PEDESTAL: &str = "PEDESTAL";
    /// Exposure time, used to group frames
    pub const EXPTIME: &str = "EXPTIME";
    /// Array width in pixels
    pub const NAXIS1: &str = "NAXIS1";
    /// Array height in pixels
    pub const NAXIS2: &str = "NAXIS2";
}

/// Scalar value stored under a header key
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Integer(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl HeaderValue {
    /// Numeric view of the value (integers are widened)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view; floats are accepted only when they carry no fraction
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(v) => Some(*v),
            HeaderValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, HeaderValue::Integer(_) | HeaderValue::Float(_))
    }
}

/// Textual form used when a value becomes a grouping key.
///
/// Floats always keep a decimal point or exponent (`10.0`, `0.5`, `1e-7`)
/// so that an integer `10` and a float `10.0` stay distinct keys.
impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Integer(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v:?}"),
            HeaderValue::Str(s) => write!(f, "{s}"),
            HeaderValue::Bool(true) => write!(f, "True"),
            HeaderValue::Bool(false) => write!(f, "False"),
        }
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Integer(value)
    }
}

impl From<i32> for HeaderValue {
    fn from(value: i32) -> Self {
        HeaderValue::Integer(value as i64)
    }
}

impl From<usize> for HeaderValue {
    fn from(value: usize) -> Self {
        HeaderValue::Integer(value as i64)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

/// One keyed header record
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub key: String,
    pub value: HeaderValue,
    pub comment: Option<String>,
}

/// Paired X/Y keys locating a tracked point feature in pixel coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureKey {
    pub x: String,
    pub y: String,
}

impl FeatureKey {
    /// Feature tracked as `<NAME>-X` / `<NAME>-Y`
    pub fn named(name: &str) -> Self {
        let name = name.to_ascii_uppercase();
        Self {
            x: format!("{name}-X"),
            y: format!("{name}-Y"),
        }
    }
}

/// The moon and sun trackers written by the acquisition software
pub fn default_feature_keys() -> Vec<FeatureKey> {
    vec![FeatureKey::named("MOON"), FeatureKey::named("SUN")]
}

/// Ordered header mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
    commentary: Vec<(String, String)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.cards
            .iter()
            .position(|card| card.key.eq_ignore_ascii_case(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.get_card(key).map(|card| &card.value)
    }

    pub fn get_card(&self, key: &str) -> Option<&Card> {
        self.position(key).map(|idx| &self.cards[idx])
    }

    /// Value under `key`, or `MissingKey`
    pub fn require(&self, key: &str) -> Result<&HeaderValue> {
        self.get(key)
            .ok_or_else(|| FrameError::MissingKey(key.to_ascii_uppercase()))
    }

    /// Numeric value under `key`; absent is `MissingKey`, non-numeric is `NonNumericKey`
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| FrameError::NonNumericKey(key.to_ascii_uppercase()))
    }

    /// Set a value, keeping the card's position and comment if the key exists
    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>) {
        match self.position(key) {
            Some(idx) => self.cards[idx].value = value.into(),
            None => self.cards.push(Card {
                key: key.to_ascii_uppercase(),
                value: value.into(),
                comment: None,
            }),
        }
    }

    /// Set a value together with its comment
    pub fn set_with_comment(&mut self, key: &str, value: impl Into<HeaderValue>, comment: &str) {
        self.push_card(Card {
            key: key.to_ascii_uppercase(),
            value: value.into(),
            comment: Some(comment.to_string()),
        });
    }

    /// Insert or replace a whole card; a replaced card keeps its position
    pub fn push_card(&mut self, card: Card) {
        match self.position(&card.key) {
            Some(idx) => self.cards[idx] = card,
            None => self.cards.push(Card {
                key: card.key.to_ascii_uppercase(),
                ..card
            }),
        }
    }

    /// Delete a key in place, returning its previous value
    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        self.position(key)
            .map(|idx| self.cards.remove(idx).value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|card| card.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards
            .iter()
            .map(|card| (card.key.as_str(), &card.value))
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// COMMENT / HISTORY lines as (keyword, text) pairs
    pub fn commentary(&self) -> &[(String, String)] {
        &self.commentary
    }

    pub fn push_commentary(&mut self, keyword: &str, text: &str) {
        self.commentary
            .push((keyword.to_ascii_uppercase(), text.to_string()));
    }
}

impl<K, V> FromIterator<(K, V)> for Header
where
    K: AsRef<str>,
    V: Into<HeaderValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = Header::new();
        for (key, value) in iter {
            header.set(key.as_ref(), value);
        }
        header
    }
}
