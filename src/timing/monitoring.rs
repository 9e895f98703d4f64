use glam::IVec3;
use serde::Serialize;

/// What happened while one target chunk was downsampled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChunkReport {
    #[serde(rename = "chunkOffset")]
    pub chunk_offset: IVec3,

    pub tiles: usize,

    /// Tiles whose source region was all background in every channel.
    #[serde(rename = "skippedTiles")]
    pub skipped_tiles: usize,

    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: f64,
}
