use std::fmt;
use std::str::FromStr;

use glam::UVec3;
use serde::{Deserialize, Serialize};
use voxel_store::{Cube, Element};

use crate::error::Error;
use crate::layer::LayerCategory;

pub mod block_vote;
pub mod spline;

pub use block_vote::{BlockReduction, BlockVoteFilter};
pub use spline::{SplineOrder, SplineResampleFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    Median,
    Mode,
    Nearest,
    Bilinear,
    Bicubic,
    Max,
    Min,
}

impl InterpolationMode {
    pub const ALL: [InterpolationMode; 7] = [
        InterpolationMode::Median,
        InterpolationMode::Mode,
        InterpolationMode::Nearest,
        InterpolationMode::Bilinear,
        InterpolationMode::Bicubic,
        InterpolationMode::Max,
        InterpolationMode::Min,
    ];

    /// Resolves a mode name. `"default"` picks MODE for segmentation layers and MEDIAN for
    /// color layers.
    pub fn resolve(name: &str, category: LayerCategory) -> Result<Self, Error> {
        if name.eq_ignore_ascii_case("default") {
            Ok(match category {
                LayerCategory::Color => InterpolationMode::Median,
                LayerCategory::Segmentation => InterpolationMode::Mode,
            })
        } else {
            name.parse()
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InterpolationMode::Median => "median",
            InterpolationMode::Mode => "mode",
            InterpolationMode::Nearest => "nearest",
            InterpolationMode::Bilinear => "bilinear",
            InterpolationMode::Bicubic => "bicubic",
            InterpolationMode::Max => "max",
            InterpolationMode::Min => "min",
        }
    }
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InterpolationMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidMode(s.to_string()))
    }
}

impl TryFrom<u32> for InterpolationMode {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        InterpolationMode::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| Error::InvalidMode(code.to_string()))
    }
}

/// Turns a fine cube into a coarse cube by block voting or spline resampling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterpolationEngine {
    BlockVote(BlockVoteFilter),
    Spline(SplineResampleFilter),
}

impl InterpolationEngine {
    pub fn new(mode: InterpolationMode) -> Self {
        match mode {
            InterpolationMode::Max => Self::BlockVote(BlockVoteFilter::new(BlockReduction::Max)),
            InterpolationMode::Min => Self::BlockVote(BlockVoteFilter::new(BlockReduction::Min)),
            InterpolationMode::Median => {
                Self::BlockVote(BlockVoteFilter::new(BlockReduction::Median))
            }
            InterpolationMode::Mode => Self::BlockVote(BlockVoteFilter::new(BlockReduction::Mode)),
            InterpolationMode::Nearest => {
                Self::Spline(SplineResampleFilter::new(SplineOrder::Nearest))
            }
            InterpolationMode::Bilinear => {
                Self::Spline(SplineResampleFilter::new(SplineOrder::Linear))
            }
            InterpolationMode::Bicubic => {
                Self::Spline(SplineResampleFilter::new(SplineOrder::Cubic))
            }
        }
    }

    /// Reduces `cube` by `factors`. Every dimension of `cube` must be divisible by its factor.
    pub fn downsample<T: Element>(&self, cube: &Cube<T>, factors: UVec3) -> Result<Cube<T>, Error> {
        match self {
            InterpolationEngine::BlockVote(filter) => filter.apply(cube, factors),
            InterpolationEngine::Spline(filter) => filter.apply(cube, factors),
        }
    }
}

pub fn downsample_cube<T: Element>(
    cube: &Cube<T>,
    factors: UVec3,
    mode: InterpolationMode,
) -> Result<Cube<T>, Error> {
    InterpolationEngine::new(mode).downsample(cube, factors)
}

/// Fails unless every dimension of `shape` is a multiple of the matching factor.
pub(crate) fn check_divisible(shape: UVec3, factors: UVec3) -> Result<UVec3, Error> {
    let remainder = shape % factors.max(UVec3::ONE);
    if factors.cmpeq(UVec3::ZERO).any() || remainder.cmpne(UVec3::ZERO).any() {
        return Err(Error::ShapeMismatch { shape, factors });
    }
    Ok(shape / factors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(
            "MEDIAN".parse::<InterpolationMode>().unwrap(),
            InterpolationMode::Median
        );
        assert_eq!(
            "bicubic".parse::<InterpolationMode>().unwrap(),
            InterpolationMode::Bicubic
        );
        assert_eq!(
            "lanczos".parse::<InterpolationMode>().unwrap_err(),
            Error::InvalidMode("lanczos".to_string())
        );
    }

    #[test]
    fn default_depends_on_layer_category() {
        assert_eq!(
            InterpolationMode::resolve("default", LayerCategory::Color).unwrap(),
            InterpolationMode::Median
        );
        assert_eq!(
            InterpolationMode::resolve("default", LayerCategory::Segmentation).unwrap(),
            InterpolationMode::Mode
        );
        assert_eq!(
            InterpolationMode::resolve("max", LayerCategory::Segmentation).unwrap(),
            InterpolationMode::Max
        );
    }

    #[test]
    fn numeric_codes() {
        assert_eq!(
            InterpolationMode::try_from(0).unwrap(),
            InterpolationMode::Median
        );
        assert_eq!(
            InterpolationMode::try_from(4).unwrap(),
            InterpolationMode::Bicubic
        );
        assert_eq!(InterpolationMode::try_from(6).unwrap(), InterpolationMode::Min);
        assert!(matches!(
            InterpolationMode::try_from(7),
            Err(Error::InvalidMode(_))
        ));
    }

    #[test]
    fn max_output_shape_is_shape_divided_by_factors() {
        let shape = UVec3::new(12, 8, 6);
        let cube = Cube::from_fn(shape, |v| (v.x * 7 + v.y * 3 + v.z) as u16);
        for factors in [
            UVec3::ONE,
            UVec3::new(2, 2, 2),
            UVec3::new(4, 2, 1),
            UVec3::new(3, 8, 6),
        ] {
            let out = downsample_cube(&cube, factors, InterpolationMode::Max).unwrap();
            assert_eq!(out.shape(), shape / factors);
        }
    }

    #[test]
    fn indivisible_shape_is_rejected_by_every_mode() {
        let cube = Cube::<u8>::zeros(UVec3::new(5, 4, 4));
        for mode in InterpolationMode::ALL {
            assert_eq!(
                downsample_cube(&cube, UVec3::splat(2), mode).unwrap_err(),
                Error::ShapeMismatch {
                    shape: UVec3::new(5, 4, 4),
                    factors: UVec3::splat(2),
                },
                "{mode}"
            );
        }
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&InterpolationMode::Bilinear).unwrap(),
            "\"bilinear\""
        );
    }
}
