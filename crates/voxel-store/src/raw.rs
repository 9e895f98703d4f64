use bytemuck::Zeroable;
use glam::UVec3;
use rayon::prelude::*;

use crate::data_type::Element;
use crate::error::StoreError;
use crate::extent::{box_volume, SubscriptToIndex};

/// A single-channel block of voxels. x varies fastest, then y, then z.
#[derive(Clone, Debug, PartialEq)]
pub struct Cube<T> {
    shape: UVec3,
    data: Vec<T>,
}

impl<T: Element> Cube<T> {
    pub fn zeros(shape: UVec3) -> Self {
        Self {
            shape,
            data: vec![T::zeroed(); box_volume(&shape)],
        }
    }

    pub fn from_vec(shape: UVec3, data: Vec<T>) -> Result<Self, StoreError> {
        if data.len() != box_volume(&shape) {
            return Err(StoreError::ShapeMismatch {
                expected: vec![box_volume(&shape)],
                actual: vec![data.len()],
            });
        }
        Ok(Self { shape, data })
    }

    pub fn from_fn(shape: UVec3, f: impl Fn(UVec3) -> T) -> Self {
        let mut data = Vec::with_capacity(box_volume(&shape));
        for z in 0..shape.z {
            for y in 0..shape.y {
                for x in 0..shape.x {
                    data.push(f(UVec3::new(x, y, z)));
                }
            }
        }
        Self { shape, data }
    }

    pub fn shape(&self) -> UVec3 {
        self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn get(&self, voxel: UVec3) -> T {
        self.data[voxel.to_index(&self.shape)]
    }

    pub fn is_background(&self) -> bool {
        self.data.par_iter().all(|v| v.is_background())
    }
}

/// A multi-channel block of voxels shaped `(channels, x, y, z)`.
/// Each channel is stored as one contiguous [`Cube`].
#[derive(Clone, Debug, PartialEq)]
pub struct RawArray<T> {
    channels: u32,
    shape: UVec3,
    data: Vec<T>,
    channel_axis: bool,
}

impl<T: Element> RawArray<T> {
    pub fn zeros(channels: u32, shape: UVec3) -> Self {
        Self {
            channels,
            shape,
            data: vec![T::zeroed(); channels as usize * box_volume(&shape)],
            channel_axis: true,
        }
    }

    pub fn from_vec(channels: u32, shape: UVec3, data: Vec<T>) -> Result<Self, StoreError> {
        let expected = channels as usize * box_volume(&shape);
        if data.len() != expected {
            return Err(StoreError::ShapeMismatch {
                expected: vec![expected],
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            channels,
            shape,
            data,
            channel_axis: true,
        })
    }

    /// Stacks equally shaped cubes along a new leading channel axis.
    pub fn from_cubes(cubes: Vec<Cube<T>>) -> Result<Self, StoreError> {
        let shape = cubes.first().map(|c| c.shape()).unwrap_or(UVec3::ZERO);
        let mut data = Vec::with_capacity(cubes.len() * box_volume(&shape));
        for cube in cubes.iter() {
            if cube.shape() != shape {
                return Err(StoreError::ShapeMismatch {
                    expected: dims(shape),
                    actual: dims(cube.shape()),
                });
            }
            data.extend_from_slice(cube.data());
        }
        Self::from_vec(cubes.len() as u32, shape, data)
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn shape(&self) -> UVec3 {
        self.shape
    }

    pub fn dims(&self) -> Vec<usize> {
        let mut d = dims(self.shape);
        if self.channel_axis {
            d.insert(0, self.channels as usize);
        }
        d
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn channel(&self, channel: u32) -> &[T] {
        let len = box_volume(&self.shape);
        let start = channel as usize * len;
        &self.data[start..start + len]
    }

    pub fn channel_mut(&mut self, channel: u32) -> &mut [T] {
        let len = box_volume(&self.shape);
        let start = channel as usize * len;
        &mut self.data[start..start + len]
    }

    pub fn channel_cube(&self, channel: u32) -> Cube<T> {
        Cube {
            shape: self.shape,
            data: self.channel(channel).to_vec(),
        }
    }

    /// `true` if every element of the channel equals the background value.
    pub fn is_channel_background(&self, channel: u32) -> bool {
        self.channel(channel).par_iter().all(|v| v.is_background())
    }

    /// Copies `cube` into `channel` so that its first voxel lands at `offset`.
    pub fn paste(&mut self, channel: u32, offset: UVec3, cube: &Cube<T>) -> Result<(), StoreError> {
        if channel >= self.channels {
            return Err(StoreError::ChannelMismatch {
                expected: self.channels,
                actual: channel + 1,
            });
        }
        if (offset + cube.shape()).cmpgt(self.shape).any() {
            return Err(StoreError::ShapeMismatch {
                expected: dims(self.shape),
                actual: dims(offset + cube.shape()),
            });
        }
        let shape = self.shape;
        let run = cube.shape().x as usize;
        let target = self.channel_mut(channel);
        for z in 0..cube.shape().z {
            for y in 0..cube.shape().y {
                let src = UVec3::new(0, y, z).to_index(&cube.shape());
                let dst = (offset + UVec3::new(0, y, z)).to_index(&shape);
                target[dst..dst + run].copy_from_slice(&cube.data()[src..src + run]);
            }
        }
        Ok(())
    }

    /// Drops the leading channel axis of a single-channel array.
    ///
    /// This is representational only: [`RawArray::dims`] reports three axes afterwards, while
    /// the buffer, [`RawArray::channels`] and everything a store reads from the array stay the
    /// same. Stores therefore treat both forms alike.
    pub fn drop_channel_axis(mut self) -> Self {
        if self.channels == 1 {
            self.channel_axis = false;
        }
        self
    }
}

fn dims(shape: UVec3) -> Vec<usize> {
    shape.to_array().iter().map(|&s| s as usize).collect()
}
