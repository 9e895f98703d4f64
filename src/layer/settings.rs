use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::job::DEFAULT_BUFFER_EDGE_LEN;
use crate::mag::{check_scale, MagLevel};

fn default_interpolation_mode() -> String {
    "default".to_string()
}

fn default_chunk_size() -> UVec3 {
    UVec3::splat(1024)
}

fn default_buffer_edge_len() -> u32 {
    DEFAULT_BUFFER_EDGE_LEN
}

/// Parameters of one downsampling run, e.g., loaded from JSON:
///
/// ```json
/// { "fromMag": "1", "maxMag": "8", "scale": [11.24, 11.24, 28.0], "interpolationMode": "max" }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DownsampleSettings {
    #[serde(rename = "fromMag")]
    pub from_mag: MagLevel,

    /// Downsampling stops after the first mag that reaches this mag on any axis.
    #[serde(rename = "maxMag")]
    pub max_mag: MagLevel,

    /// The physical size of one voxel at mag 1. Without it all axes are downsampled together.
    #[serde(default)]
    pub scale: Option<Vec3>,

    /// A mode name or `"default"`.
    #[serde(rename = "interpolationMode", default = "default_interpolation_mode")]
    pub interpolation_mode: String,

    /// The edge lengths of one chunk job's target region.
    #[serde(rename = "chunkSize", default = "default_chunk_size")]
    pub chunk_size: UVec3,

    #[serde(rename = "bufferEdgeLen", default = "default_buffer_edge_len")]
    pub buffer_edge_len: u32,

    /// The number of worker threads. Uses the executor's default if not set.
    #[serde(default)]
    pub parallelism: Option<usize>,
}

impl DownsampleSettings {
    pub fn new(from_mag: MagLevel, max_mag: MagLevel) -> Self {
        Self {
            from_mag,
            max_mag,
            scale: None,
            interpolation_mode: default_interpolation_mode(),
            chunk_size: default_chunk_size(),
            buffer_edge_len: default_buffer_edge_len(),
            parallelism: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects chunk sizes with an empty axis and degenerate voxel scales.
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_size.cmpeq(UVec3::ZERO).any() {
            return Err(Error::InvalidSettings(format!(
                "chunk size {} has an empty axis",
                self.chunk_size
            )));
        }
        if let Some(scale) = self.scale {
            check_scale(scale)?;
        }
        Ok(())
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_interpolation_mode(mut self, mode: &str) -> Self {
        self.interpolation_mode = mode.to_string();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: UVec3) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_buffer_edge_len(mut self, buffer_edge_len: u32) -> Self {
        self.buffer_edge_len = buffer_edge_len;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Tiles never exceed the smallest chunk edge.
    pub fn effective_buffer_edge_len(&self) -> u32 {
        self.buffer_edge_len.min(self.chunk_size.min_element()).max(1)
    }
}
