use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytemuck::Zeroable;
use glam::{IVec3, UVec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::bounding_box::BoundingBox;
use crate::data_type::{Element, ElementType};
use crate::error::StoreError;
use crate::extent::{box_volume, SubscriptToIndex};
use crate::persistence_mode::PersistenceMode;
use crate::raw::RawArray;

/// A handle to the voxels of one pyramid level.
///
/// Implementations must allow concurrent `read`s and concurrent `write`s of disjoint regions
/// through a shared reference.
pub trait VoxelStore<T: Element>: Send + Sync + Debug {
    fn open(&self) -> Result<(), StoreError>;

    fn close(&self) -> Result<(), StoreError>;

    /// Reads `region` (global voxel coordinates). Voxels that were never written read as
    /// background.
    fn read(&self, region: &BoundingBox) -> Result<RawArray<T>, StoreError>;

    /// Writes `data` with its first voxel at the global coordinate `offset`.
    fn write(&self, offset: IVec3, data: &RawArray<T>) -> Result<(), StoreError>;

    /// The addressable region of this level.
    fn bounding_box(&self) -> BoundingBox;

    /// Grows the addressable region so that it contains `bounding_box`. Never shrinks it.
    fn widen(&self, bounding_box: &BoundingBox) -> Result<(), StoreError>;

    fn channel_count(&self) -> u32;

    fn global_offset(&self) -> IVec3 {
        self.bounding_box().offset
    }

    fn size(&self) -> UVec3 {
        self.bounding_box().size
    }

    fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }
}

fn default_chunk_size() -> UVec3 {
    UVec3::splat(32)
}

fn one() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StoreOptions {
    /// The edge lengths of one storage chunk.
    #[serde(rename = "chunkSize", default = "default_chunk_size")]
    pub chunk_size: UVec3,

    #[serde(rename = "numChannels", default = "one")]
    pub channels: u32,

    #[serde(default)]
    pub mode: PersistenceMode,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            channels: 1,
            mode: PersistenceMode::ReadWrite,
        }
    }
}

/// A sparse, chunked in-memory `VoxelStore`.
/// Chunks are allocated on first write; the bounding box grows to include every written region.
#[derive(Debug)]
pub struct MemoryStore<T> {
    options: StoreOptions,
    bounding_box: RwLock<BoundingBox>,
    chunks: RwLock<HashMap<[i32; 3], Vec<T>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl<T: Element> MemoryStore<T> {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            bounding_box: RwLock::new(BoundingBox::default()),
            chunks: RwLock::new(HashMap::new()),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn with_bounding_box(options: StoreOptions, bounding_box: BoundingBox) -> Self {
        let store = Self::new(options);
        *store.bounding_box.write() = bounding_box;
        store
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.read().len()
    }

    /// All allocated chunks ordered by chunk index (z slowest).
    pub fn snapshot(&self) -> Vec<(IVec3, Vec<T>)> {
        let mut chunks: Vec<(IVec3, Vec<T>)> = self
            .chunks
            .read()
            .iter()
            .map(|(k, v)| (IVec3::from(*k), v.clone()))
            .collect();
        chunks.sort_by_key(|(k, _)| (k.z, k.y, k.x));
        chunks
    }

    fn chunk_index(&self, voxel: IVec3) -> IVec3 {
        let chunk_size = self.options.chunk_size.as_ivec3();
        IVec3::new(
            voxel.x.div_euclid(chunk_size.x),
            voxel.y.div_euclid(chunk_size.y),
            voxel.z.div_euclid(chunk_size.z),
        )
    }

    fn is_open(&self) -> bool {
        self.open_count() > self.close_count()
    }
}

impl<T: Element> VoxelStore<T> for MemoryStore<T> {
    fn open(&self) -> Result<(), StoreError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        if !self.is_open() {
            return Err(StoreError::NotOpen);
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, region: &BoundingBox) -> Result<RawArray<T>, StoreError> {
        if !self.is_open() {
            return Err(StoreError::NotOpen);
        }
        let channels = self.options.channels;
        let chunk_size = self.options.chunk_size;
        let mut out = RawArray::zeros(channels, region.size);
        let chunks = self.chunks.read();
        for part in region.chunks(chunk_size) {
            let key = self.chunk_index(part.offset);
            if let Some(chunk) = chunks.get(&key.to_array()) {
                let chunk_origin = key * chunk_size.as_ivec3();
                let chunk_len = box_volume(&chunk_size);
                for c in 0..channels {
                    let src = &chunk[c as usize * chunk_len..(c as usize + 1) * chunk_len];
                    copy_block(
                        src,
                        chunk_size,
                        (part.offset - chunk_origin).as_uvec3(),
                        out.channel_mut(c),
                        region.size,
                        (part.offset - region.offset).as_uvec3(),
                        part.size,
                    );
                }
            }
        }
        Ok(out)
    }

    fn write(&self, offset: IVec3, data: &RawArray<T>) -> Result<(), StoreError> {
        if !self.options.mode.is_writable() {
            return Err(StoreError::ReadOnly);
        }
        if data.channels() != self.options.channels {
            return Err(StoreError::ChannelMismatch {
                expected: self.options.channels,
                actual: data.channels(),
            });
        }
        let channels = self.options.channels;
        let chunk_size = self.options.chunk_size;
        let chunk_len = box_volume(&chunk_size);
        let region = BoundingBox::new(offset, data.shape());
        {
            let mut chunks = self.chunks.write();
            for part in region.chunks(chunk_size) {
                let key = self.chunk_index(part.offset);
                let chunk_origin = key * chunk_size.as_ivec3();
                let chunk = chunks
                    .entry(key.to_array())
                    .or_insert_with(|| vec![T::zeroed(); channels as usize * chunk_len]);
                for c in 0..channels {
                    let dst = &mut chunk[c as usize * chunk_len..(c as usize + 1) * chunk_len];
                    copy_block(
                        data.channel(c),
                        data.shape(),
                        (part.offset - offset).as_uvec3(),
                        dst,
                        chunk_size,
                        (part.offset - chunk_origin).as_uvec3(),
                        part.size,
                    );
                }
            }
        }
        let mut bounding_box = self.bounding_box.write();
        *bounding_box = bounding_box.union(&region);
        Ok(())
    }

    fn bounding_box(&self) -> BoundingBox {
        *self.bounding_box.read()
    }

    fn widen(&self, bounding_box: &BoundingBox) -> Result<(), StoreError> {
        if !self.options.mode.is_writable() {
            return Err(StoreError::ReadOnly);
        }
        let mut current = self.bounding_box.write();
        log::debug!("widening {} to include {}", *current, bounding_box);
        *current = current.union(bounding_box);
        Ok(())
    }

    fn channel_count(&self) -> u32 {
        self.options.channels
    }
}

/// Copies a `size` block between two x-fastest buffers, one x-run at a time.
fn copy_block<T: Copy>(
    src: &[T],
    src_shape: UVec3,
    src_origin: UVec3,
    dst: &mut [T],
    dst_shape: UVec3,
    dst_origin: UVec3,
    size: UVec3,
) {
    let run = size.x as usize;
    for z in 0..size.z {
        for y in 0..size.y {
            let row = UVec3::new(0, y, z);
            let s = (src_origin + row).to_index(&src_shape);
            let d = (dst_origin + row).to_index(&dst_shape);
            dst[d..d + run].copy_from_slice(&src[s..s + run]);
        }
    }
}
