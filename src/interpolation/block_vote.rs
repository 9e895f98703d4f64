use std::cmp::Ordering;

use bytemuck::Zeroable;
use glam::UVec3;
use rayon::prelude::*;
use voxel_store::extent::box_volume;
use voxel_store::{Cube, Element};

use crate::error::Error;
use crate::interpolation::check_divisible;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockReduction {
    Max,
    Min,
    Median,
    Mode,
}

impl BlockReduction {
    /// Reduces one block. The block is reordered in place.
    pub fn reduce<T: Element>(&self, block: &mut [T]) -> T {
        match self {
            BlockReduction::Max => extreme(block, Ordering::Greater),
            BlockReduction::Min => extreme(block, Ordering::Less),
            BlockReduction::Median => median(block),
            BlockReduction::Mode => mode(block),
        }
    }
}

fn extreme<T: Element>(block: &[T], keep: Ordering) -> T {
    block
        .iter()
        .copied()
        .reduce(|a, b| if b.voxel_cmp(&a) == keep { b } else { a })
        .unwrap_or_else(T::zeroed)
}

/// The middle value, or the truncated mean of the two middle values for even counts.
fn median<T: Element>(block: &mut [T]) -> T {
    if block.is_empty() {
        return T::zeroed();
    }
    block.sort_unstable_by(|a, b| a.voxel_cmp(b));
    let n = block.len();
    if n % 2 == 1 {
        block[n / 2]
    } else {
        T::mean_of_two(block[n / 2 - 1], block[n / 2])
    }
}

/// The most frequent value. Ties go to the smallest value.
fn mode<T: Element>(block: &mut [T]) -> T {
    block.sort_unstable_by(|a, b| a.voxel_cmp(b));
    let mut best = T::zeroed();
    let mut best_count = 0;
    let mut i = 0;
    while i < block.len() {
        let value = block[i];
        let mut j = i + 1;
        while j < block.len() && block[j].voxel_cmp(&value) == Ordering::Equal {
            j += 1;
        }
        if j - i > best_count {
            best = value;
            best_count = j - i;
        }
        i = j;
    }
    best
}

/// Replaces every block of `factors` voxels by one voxel computed by a [`BlockReduction`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockVoteFilter {
    reduction: BlockReduction,
}

impl BlockVoteFilter {
    pub fn new(reduction: BlockReduction) -> Self {
        Self { reduction }
    }

    pub fn reduction(&self) -> BlockReduction {
        self.reduction
    }

    pub fn apply<T: Element>(&self, cube: &Cube<T>, factors: UVec3) -> Result<Cube<T>, Error> {
        let out_shape = check_divisible(cube.shape(), factors)?;
        let in_shape = cube.shape();
        let mut out = Cube::zeros(out_shape);
        let slice_len = (out_shape.x * out_shape.y) as usize;
        if slice_len == 0 {
            return Ok(out);
        }

        let input = cube.data();
        let (fx, fy, fz) = (factors.x as usize, factors.y as usize, factors.z as usize);
        let (sx, sxy) = (in_shape.x as usize, (in_shape.x * in_shape.y) as usize);
        let reduction = self.reduction;

        out.data_mut()
            .par_chunks_mut(slice_len)
            .enumerate()
            .for_each(|(z, slice)| {
                let mut block = Vec::with_capacity(box_volume(&factors));
                for (i, voxel) in slice.iter_mut().enumerate() {
                    let x = i % out_shape.x as usize;
                    let y = i / out_shape.x as usize;
                    block.clear();
                    for bz in z * fz..(z + 1) * fz {
                        for by in y * fy..(y + 1) * fy {
                            let row = bz * sxy + by * sx;
                            block.extend_from_slice(&input[row + x * fx..row + (x + 1) * fx]);
                        }
                    }
                    *voxel = reduction.reduce(&mut block);
                }
            });
        Ok(out)
    }
}
