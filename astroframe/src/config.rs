//! Pipeline settings, persisted as JSON.

use crate::geometry::{InsetParams, DEFAULT_CROP_SIZE};
use crate::header::{default_feature_keys, FeatureKey};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Magnified-inset overlay settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsetConfig {
    pub scale: usize,
    pub border_thickness: usize,
    /// NaN is written as JSON `null`
    #[serde(with = "nan_as_null")]
    pub border_value: f64,
}

impl Default for InsetConfig {
    fn default() -> Self {
        Self {
            scale: 4,
            border_thickness: 2,
            border_value: f64::NAN,
        }
    }
}

impl InsetConfig {
    /// Inset around `center = (row, column)` with these overlay settings
    pub fn params(&self, center: (usize, usize), radii: (usize, usize)) -> InsetParams {
        InsetParams::new(center, radii)
            .with_scale(self.scale)
            .with_border(self.border_value, self.border_thickness)
    }
}

/// Tunables shared by the pipeline binaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Encode frames as unsigned 16-bit rather than keeping float samples
    pub convert_to_uint16: bool,
    pub crop_width: usize,
    pub crop_height: usize,
    pub inset: InsetConfig,
    /// Header coordinate pairs kept in step with crops
    pub feature_keys: Vec<FeatureKey>,
    /// File extension, without the dot, that discovery picks up
    pub fits_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            convert_to_uint16: true,
            crop_width: DEFAULT_CROP_SIZE,
            crop_height: DEFAULT_CROP_SIZE,
            inset: InsetConfig::default(),
            feature_keys: default_feature_keys(),
            fits_extension: "fits".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file; missing fields take their defaults
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Load `path` if given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, std::io::Error> {
        path.map_or_else(|| Ok(Self::default()), Self::load_from_file)
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
