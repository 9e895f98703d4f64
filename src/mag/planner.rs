use glam::{UVec3, Vec3};

use crate::error::Error;
use crate::mag::MagLevel;

/// Fails unless every component of `scale` is a positive finite voxel size.
pub fn check_scale(scale: Vec3) -> Result<(), Error> {
    if scale.to_array().iter().all(|s| s.is_finite() && *s > 0.0) {
        Ok(())
    } else {
        Err(Error::InvalidSettings(format!(
            "voxel scale {scale} must be positive and finite on every axis"
        )))
    }
}

/// Computes the mag following `mag`.
///
/// Without a voxel scale every axis is doubled. With a scale, axes whose physical voxel size is
/// already the coarsest stay unchanged until the finest axis has caught up, after which all axes
/// are doubled together.
pub fn next_mag(mag: MagLevel, scale: Option<Vec3>) -> MagLevel {
    let scale = match scale {
        Some(scale) => scale,
        None => return mag.scaled_by(2),
    };

    let s = scale.to_array();
    let m = mag.to_array();
    let mut hi = 0;
    let mut lo = 0;
    for axis in 1..3 {
        if s[axis] > s[hi] {
            hi = axis;
        }
        if s[axis] < s[lo] {
            lo = axis;
        }
    }

    let resolution = |axis: usize| m[axis] as f64 * s[axis] as f64;
    if resolution(lo) < resolution(hi) {
        let mut factors = [2u32; 3];
        for axis in 0..3 {
            if s[axis] == s[hi] {
                factors[axis] = 1;
            }
        }
        mag.scaled(UVec3::from(factors))
    } else {
        mag.scaled_by(2)
    }
}

/// Produces the chain of mags to materialize above a starting mag.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResolutionPyramidPlanner {
    scale: Option<Vec3>,
    max_mag: MagLevel,
}

impl ResolutionPyramidPlanner {
    pub fn new(scale: Option<Vec3>, max_mag: MagLevel) -> Result<Self, Error> {
        if let Some(scale) = scale {
            check_scale(scale)?;
        }
        Ok(Self { scale, max_mag })
    }

    pub fn scale(&self) -> Option<Vec3> {
        self.scale
    }

    pub fn max_mag(&self) -> MagLevel {
        self.max_mag
    }

    /// The mags coarser than `from`, finest first. The last mag is the first one that reaches
    /// or exceeds the maximum mag on any axis. Never empty.
    pub fn plan(&self, from: MagLevel) -> Vec<MagLevel> {
        let mut mags = Vec::new();
        let mut current = from;
        loop {
            let next = next_mag(current, self.scale);
            mags.push(next);
            if next.to_uvec3().cmpge(self.max_mag.to_uvec3()).any() {
                break;
            }
            current = next;
        }
        mags
    }
}
