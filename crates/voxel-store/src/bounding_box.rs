use std::fmt;

use glam::{IVec3, UVec3};
use serde::{Deserialize, Serialize};

/// An axis-aligned box of voxels at one mag: the voxels `offset..offset + size`.
#[readonly::make]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoundingBox {
    /// Global voxel coordinate of the first voxel.
    #[serde(rename = "topLeft")]
    pub offset: IVec3,

    pub size: UVec3,
}

impl BoundingBox {
    pub fn new(offset: IVec3, size: UVec3) -> Self {
        Self { offset, size }
    }

    pub fn from_corners(offset: IVec3, end: IVec3) -> Self {
        Self {
            offset,
            size: (end - offset).max(IVec3::ZERO).as_uvec3(),
        }
    }

    pub fn end(&self) -> IVec3 {
        self.offset + self.size.as_ivec3()
    }

    pub fn is_empty(&self) -> bool {
        self.size.cmpeq(UVec3::ZERO).any()
    }

    pub fn volume(&self) -> usize {
        self.size.to_array().iter().map(|&s| s as usize).product()
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.is_empty()
            || (self.offset.cmple(other.offset).all() && self.end().cmpge(other.end()).all())
    }

    /// The smallest box containing both boxes. Empty boxes do not contribute.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::from_corners(self.offset.min(other.offset), self.end().max(other.end()))
    }

    pub fn intersection(&self, other: &BoundingBox) -> BoundingBox {
        Self::from_corners(self.offset.max(other.offset), self.end().min(other.end()))
    }

    /// Multiplies offset and size componentwise, i.e., maps the box to a finer mag.
    pub fn scaled_by(&self, factor: UVec3) -> BoundingBox {
        Self {
            offset: self.offset * factor.as_ivec3(),
            size: self.size * factor,
        }
    }

    /// Partitions the box into chunks aligned to the global grid of multiples of `chunk_size`.
    /// Chunks at the border are clipped to the box, so the result tiles the box exactly.
    /// The chunks are ordered x fastest, then y, then z.
    pub fn chunks(&self, chunk_size: UVec3) -> Vec<BoundingBox> {
        if self.is_empty() || chunk_size.cmpeq(UVec3::ZERO).any() {
            return Vec::new();
        }
        let chunk_size = chunk_size.as_ivec3();
        let first = IVec3::new(
            self.offset.x.div_euclid(chunk_size.x),
            self.offset.y.div_euclid(chunk_size.y),
            self.offset.z.div_euclid(chunk_size.z),
        );
        let end = self.end();
        let last = IVec3::new(
            (end.x - 1).div_euclid(chunk_size.x),
            (end.y - 1).div_euclid(chunk_size.y),
            (end.z - 1).div_euclid(chunk_size.z),
        );

        let mut chunks = Vec::new();
        for z in first.z..=last.z {
            for y in first.y..=last.y {
                for x in first.x..=last.x {
                    let chunk_offset = IVec3::new(x, y, z) * chunk_size;
                    let chunk = BoundingBox::new(chunk_offset, chunk_size.as_uvec3());
                    chunks.push(self.intersection(&chunk));
                }
            }
        }
        chunks
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(offset: [{}, {}, {}], size: [{}, {}, {}])",
            self.offset.x, self.offset.y, self.offset.z, self.size.x, self.size.y, self.size.z
        )
    }
}
