use glam::{IVec3, UVec3};
use voxel_store::BoundingBox;

use crate::error::Error;
use crate::mag::MagLevel;

fn floor_div(a: IVec3, b: IVec3) -> IVec3 {
    IVec3::new(a.x.div_euclid(b.x), a.y.div_euclid(b.y), a.z.div_euclid(b.z))
}

fn ceil_div(a: IVec3, b: IVec3) -> IVec3 {
    -floor_div(-a, b)
}

/// Widens `bounding_box` so that its offset and end are multiples of `factor`.
pub fn align_with_mag(bounding_box: &BoundingBox, factor: UVec3) -> BoundingBox {
    if bounding_box.is_empty() {
        return *bounding_box;
    }
    let factor = factor.max(UVec3::ONE).as_ivec3();
    BoundingBox::from_corners(
        floor_div(bounding_box.offset, factor) * factor,
        ceil_div(bounding_box.end(), factor) * factor,
    )
}

/// Divides offset and size by `factor`. Fails if either is not an exact multiple.
pub fn scale_down_exact(bounding_box: &BoundingBox, factor: UVec3) -> Result<BoundingBox, Error> {
    let f = factor.as_ivec3();
    if factor.cmpeq(UVec3::ZERO).any()
        || floor_div(bounding_box.offset, f) * f != bounding_box.offset
        || (bounding_box.size % factor).cmpne(UVec3::ZERO).any()
    {
        return Err(Error::PlanningInconsistency(format!(
            "{} is not divisible by {:?}",
            bounding_box,
            factor.to_array()
        )));
    }
    Ok(BoundingBox::new(
        floor_div(bounding_box.offset, f),
        bounding_box.size / factor,
    ))
}

/// Padded bounding boxes for every level of a chain, finest first.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentPlan {
    levels: Vec<(MagLevel, BoundingBox)>,
}

impl AlignmentPlan {
    pub fn levels(&self) -> &[(MagLevel, BoundingBox)] {
        &self.levels
    }

    pub fn get(&self, mag: MagLevel) -> Option<BoundingBox> {
        self.levels
            .iter()
            .find(|(m, _)| *m == mag)
            .map(|(_, bounding_box)| *bounding_box)
    }
}

/// Pads the levels of a mag chain so that each level divides exactly into the next coarser one,
/// all the way to the coarsest mag.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentPlanner {
    chain: Vec<MagLevel>,
}

impl AlignmentPlanner {
    /// `chain` must be ordered finest first and every mag must be a multiple of its predecessor.
    pub fn new(chain: Vec<MagLevel>) -> Result<Self, Error> {
        if chain.is_empty() {
            return Err(Error::PlanningInconsistency(
                "cannot align an empty mag chain".to_string(),
            ));
        }
        for pair in chain.windows(2) {
            pair[1].relative_to(&pair[0])?;
        }
        Ok(Self { chain })
    }

    pub fn chain(&self) -> &[MagLevel] {
        &self.chain
    }

    /// `base` is the data region in voxels of the finest mag of the chain.
    pub fn plan(&self, base: &BoundingBox) -> Result<AlignmentPlan, Error> {
        let finest = self.chain[0];
        let coarsest = self.chain[self.chain.len() - 1];
        if base.is_empty() {
            return Ok(AlignmentPlan {
                levels: self
                    .chain
                    .iter()
                    .map(|mag| (*mag, BoundingBox::default()))
                    .collect(),
            });
        }

        let mut padded = align_with_mag(base, coarsest.relative_to(&finest)?);
        let mut levels = vec![(finest, padded)];
        for pair in self.chain.windows(2) {
            let factor = pair[1].relative_to(&pair[0])?;
            let coarse = scale_down_exact(&padded, factor)?;
            if coarse.scaled_by(factor) != padded {
                return Err(Error::PlanningInconsistency(format!(
                    "mag {} {} does not scale back to {}",
                    pair[1], coarse, padded
                )));
            }
            levels.push((pair[1], coarse));
            padded = coarse;
        }
        Ok(AlignmentPlan { levels })
    }
}
