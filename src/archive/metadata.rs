use serde_json::{Map, Value};

use crate::foundation::{
    core::BoundingBox,
    error::{FramecapError, FramecapResult},
};

/// Archive layout version written by this crate.
pub const ARCHIVE_VERSION: u32 = 1;

/// Versions [`crate::FrameStore`] knows how to read.
pub const SUPPORTED_VERSIONS: &[u32] = &[ARCHIVE_VERSION];

/// Archive-level metadata (`metadata.json`).
///
/// Fields this crate does not interpret (device name, test name, ...) live in `extra` and are
/// written back untouched.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    pub version: u32,
    /// ISO-8601 capture start time.
    pub date: String,
    /// `(width, height)` of every frame in the archive.
    pub frame_dimensions: (u32, u32),
    /// Rectangles excluded from frame differencing (clocks, spinners, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_areas: Vec<BoundingBox>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CaptureMetadata {
    pub fn new(date: impl Into<String>, frame_dimensions: (u32, u32)) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            date: date.into(),
            frame_dimensions,
            ignore_areas: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Merge caller-supplied fields on top of the structural ones.
    ///
    /// Caller values win for everything except `version` and `frameDimensions`, which describe
    /// the archive layout itself.
    pub fn merged_with(mut self, caller: &Map<String, Value>) -> FramecapResult<Self> {
        for (k, v) in caller {
            match k.as_str() {
                "version" | "frameDimensions" => {
                    tracing::warn!(field = %k, "ignoring caller override of structural metadata");
                }
                "date" => {
                    self.date = v
                        .as_str()
                        .ok_or_else(|| FramecapError::validation("metadata 'date' must be a string"))?
                        .to_string();
                }
                "ignoreAreas" => {
                    self.ignore_areas = serde_json::from_value(v.clone()).map_err(|e| {
                        FramecapError::validation(format!("invalid 'ignoreAreas': {e}"))
                    })?;
                }
                _ => {
                    self.extra.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(self)
    }

    /// Parse and validate the raw bytes of a `metadata.json` entry.
    pub fn from_json_slice(bytes: &[u8]) -> FramecapResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| FramecapError::archive(format!("metadata is not valid JSON: {e}")))?;
        let obj = value
            .as_object()
            .filter(|o| !o.is_empty())
            .ok_or_else(|| FramecapError::archive("metadata is empty or not an object"))?;

        let version = obj
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| FramecapError::archive("metadata has no version"))?;
        if !SUPPORTED_VERSIONS.iter().any(|v| u64::from(*v) == version) {
            return Err(FramecapError::archive(format!(
                "unrecognized archive version {version}"
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| FramecapError::archive(format!("malformed metadata: {e}")))
    }

    pub fn to_json_vec(&self) -> FramecapResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| FramecapError::serde(e.to_string()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/archive/metadata.rs"]
mod tests;
