use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::{IVec3, UVec3};
use voxel_store::{BoundingBox, Element, RawArray, VoxelStore};

use crate::error::Error;
use crate::interpolation::{InterpolationEngine, InterpolationMode};
use crate::timing::{ChunkReport, JobMonitor, NoopMonitor};

pub mod executor;

pub use executor::{Job, JobExecutor, RayonExecutor, SequentialExecutor};

pub const DEFAULT_BUFFER_EDGE_LEN: u32 = 256;

/// Splits a region of `size` voxels into tiles of at most `edge_len` voxels per axis.
/// Tile offsets are relative to the region's origin; the last tile along an axis may be shorter.
pub fn tiles(size: UVec3, edge_len: u32) -> Vec<BoundingBox> {
    BoundingBox::new(IVec3::ZERO, size).chunks(UVec3::splat(edge_len.max(1)))
}

/// Downsamples one chunk of a target level from the next finer level.
///
/// The chunk is assembled in memory and written with a single call, so a failed job never leaves
/// a partially written chunk behind.
pub struct ChunkedDownsampleJob<T: Element> {
    target_chunk: BoundingBox,
    mag_factors: UVec3,
    mode: InterpolationMode,
    buffer_edge_len: u32,
    channels: u32,
    source: Arc<dyn VoxelStore<T>>,
    target: Arc<dyn VoxelStore<T>>,
    monitor: Arc<dyn JobMonitor>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl<T: Element> ChunkedDownsampleJob<T> {
    pub fn new(
        target_chunk: BoundingBox,
        mag_factors: UVec3,
        mode: InterpolationMode,
        channels: u32,
        source: Arc<dyn VoxelStore<T>>,
        target: Arc<dyn VoxelStore<T>>,
    ) -> Self {
        Self {
            target_chunk,
            mag_factors,
            mode,
            buffer_edge_len: DEFAULT_BUFFER_EDGE_LEN,
            channels,
            source,
            target,
            monitor: Arc::new(NoopMonitor),
            cancelled: None,
        }
    }

    pub fn with_buffer_edge_len(mut self, buffer_edge_len: u32) -> Self {
        self.buffer_edge_len = buffer_edge_len;
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn JobMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(cancelled);
        self
    }

    pub fn target_chunk(&self) -> &BoundingBox {
        &self.target_chunk
    }

    /// The region of the source level that downsamples onto the target chunk.
    pub fn source_region(&self) -> BoundingBox {
        self.target_chunk.scaled_by(self.mag_factors)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst))
    }

    /// Reads and reduces all tiles of the chunk. Returns the assembled buffer, the number of
    /// tiles and the number of tiles that were background in every channel.
    fn assemble(&self) -> Result<(RawArray<T>, usize, usize), Error> {
        let offset = self.target_chunk.offset;
        let factors = self.mag_factors;
        let source_region = self.source_region();
        let engine = InterpolationEngine::new(self.mode);
        let mut buffer = RawArray::zeros(self.channels, self.target_chunk.size);

        let tiles = tiles(self.target_chunk.size, self.buffer_edge_len);
        let mut skipped = 0;
        for tile in tiles.iter() {
            let tile_offset = tile.offset.as_uvec3();
            let source_offset = tile_offset * factors;
            let source_size = (tile.size * factors).min(source_region.size - source_offset);
            let request = BoundingBox::new(
                source_region.offset + source_offset.as_ivec3(),
                source_size,
            );
            let data = self
                .source
                .read(&request)
                .map_err(|source| Error::SourceReadFailure { offset, source })?;
            if data.channels() != self.channels {
                return Err(Error::SourceReadFailure {
                    offset,
                    source: voxel_store::StoreError::ChannelMismatch {
                        expected: self.channels,
                        actual: data.channels(),
                    },
                });
            }

            let mut background_channels = 0;
            for channel in 0..self.channels {
                if data.is_channel_background(channel) {
                    background_channels += 1;
                    continue;
                }
                let reduced = engine.downsample(&data.channel_cube(channel), factors)?;
                if reduced.shape() != tile.size {
                    return Err(Error::ShapeMismatch {
                        shape: source_size,
                        factors,
                    });
                }
                buffer
                    .paste(channel, tile_offset, &reduced)
                    .map_err(|_| Error::ShapeMismatch {
                        shape: source_size,
                        factors,
                    })?;
            }
            if background_channels == self.channels {
                skipped += 1;
            }
        }
        Ok((buffer, tiles.len(), skipped))
    }

    fn process(&self) -> Result<(usize, usize), Error> {
        let (buffer, tiles, skipped) = self.assemble()?;
        let buffer = buffer.drop_channel_axis();
        self.target
            .write(self.target_chunk.offset, &buffer)
            .map_err(|source| Error::TargetWriteFailure {
                offset: self.target_chunk.offset,
                source,
            })?;
        Ok((tiles, skipped))
    }
}

impl<T: Element> Job for ChunkedDownsampleJob<T> {
    type Output = ChunkReport;

    fn run(&self) -> Result<ChunkReport, Error> {
        let offset = self.target_chunk.offset;
        if self.is_cancelled() {
            return Err(Error::Cancelled { offset });
        }

        let span = self
            .monitor
            .start(&format!("downsampling chunk {:?}", offset.to_array()));
        if let Err(source) = self.source.open() {
            let error = Error::SourceReadFailure { offset, source };
            log::error!("Downsampling of {:?} failed with {}", offset.to_array(), error);
            return Err(error);
        }
        let result = self.process();
        if let Err(error) = self.source.close() {
            log::warn!(
                "could not close source after downsampling {:?}: {}",
                offset.to_array(),
                error
            );
        }
        let elapsed_ms = self.monitor.stop(span);

        match result {
            Ok((tiles, skipped_tiles)) => Ok(ChunkReport {
                chunk_offset: offset,
                tiles,
                skipped_tiles,
                elapsed_ms,
            }),
            Err(error) => {
                log::error!("Downsampling of {:?} failed with {}", offset.to_array(), error);
                Err(error)
            }
        }
    }
}

impl<T: Element> fmt::Debug for ChunkedDownsampleJob<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedDownsampleJob")
            .field("target_chunk", &self.target_chunk)
            .field("mag_factors", &self.mag_factors)
            .field("mode", &self.mode)
            .field("buffer_edge_len", &self.buffer_edge_len)
            .field("channels", &self.channels)
            .finish()
    }
}
