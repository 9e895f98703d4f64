use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use glam::UVec3;
use serde::{Deserialize, Serialize};

use crate::error::Error;

mod planner;

pub use planner::{check_scale, next_mag, ResolutionPyramidPlanner};

/// The per-axis downsampling factor of a pyramid level relative to the base resolution.
///
/// Every component is a positive power of two. Mags are ordered by their largest component,
/// i.e., a mag is coarser than another if its largest factor is larger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct MagLevel(UVec3);

impl MagLevel {
    pub const ONE: MagLevel = MagLevel(UVec3::ONE);

    pub fn new(factors: UVec3) -> Result<Self, Error> {
        if factors.to_array().iter().all(|f| f.is_power_of_two()) {
            Ok(Self(factors))
        } else {
            Err(Error::InvalidMag(format!("{:?}", factors.to_array())))
        }
    }

    pub fn isotropic(factor: u32) -> Result<Self, Error> {
        Self::new(UVec3::splat(factor))
    }

    pub fn to_uvec3(&self) -> UVec3 {
        self.0
    }

    pub fn to_array(&self) -> [u32; 3] {
        self.0.to_array()
    }

    pub fn max_dim(&self) -> u32 {
        self.0.max_element()
    }

    pub fn scaled_by(&self, k: u32) -> MagLevel {
        MagLevel(self.0 * k)
    }

    pub(crate) fn scaled(&self, factors: UVec3) -> MagLevel {
        MagLevel(self.0 * factors)
    }

    /// `true` if no axis of `self` is coarser than the same axis of `other`.
    pub fn is_finer_or_equal(&self, other: &MagLevel) -> bool {
        self.0.cmple(other.0).all()
    }

    /// The componentwise factor from the finer mag `finer` to `self`.
    pub fn relative_to(&self, finer: &MagLevel) -> Result<UVec3, Error> {
        if !finer.is_finer_or_equal(self) || (self.0 % finer.0).cmpne(UVec3::ZERO).any() {
            return Err(Error::PlanningInconsistency(format!(
                "mag {self} is not an integer multiple of mag {finer}"
            )));
        }
        Ok(self.0 / finer.0)
    }
}

impl PartialOrd for MagLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MagLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max_dim()
            .cmp(&other.max_dim())
            .then_with(|| self.to_array().cmp(&other.to_array()))
    }
}

impl Hash for MagLevel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_array().hash(state);
    }
}

impl fmt::Display for MagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.0.x, self.0.y, self.0.z)
    }
}

/// Parses `"2"` (isotropic) or `"2-4-4"`.
impl FromStr for MagLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('-')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()
            .map_err(|_| Error::InvalidMag(s.to_string()))?;
        match parts.as_slice() {
            [f] => Self::isotropic(*f),
            [x, y, z] => Self::new(UVec3::new(*x, *y, *z)),
            _ => Err(Error::InvalidMag(s.to_string())),
        }
    }
}

impl TryFrom<String> for MagLevel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MagLevel> for String {
    fn from(mag: MagLevel) -> Self {
        mag.to_string()
    }
}
