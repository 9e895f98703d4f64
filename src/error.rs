use std::fmt;
use std::fmt::{Display, Formatter};

use glam::{IVec3, UVec3};
use voxel_store::StoreError;

use crate::mag::MagLevel;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A cube dimension is not divisible by its downsampling factor.
    ShapeMismatch { shape: UVec3, factors: UVec3 },
    InvalidMode(String),
    InvalidMag(String),
    InvalidSettings(String),
    SourceReadFailure { offset: IVec3, source: StoreError },
    TargetWriteFailure { offset: IVec3, source: StoreError },
    PlanningInconsistency(String),
    Cancelled { offset: IVec3 },
    /// At least one chunk job of a level failed. Coarser levels were not touched.
    LevelFailed {
        mag: MagLevel,
        failed: usize,
        total: usize,
        first: Box<Error>,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Error::ShapeMismatch { shape, factors } => write!(
                f,
                "shape {:?} is not divisible by factors {:?}",
                shape.to_array(),
                factors.to_array()
            ),
            Error::InvalidMode(mode) => write!(f, "invalid interpolation mode: {mode}"),
            Error::InvalidMag(mag) => write!(f, "invalid mag: {mag}"),
            Error::InvalidSettings(message) => write!(f, "invalid settings: {message}"),
            Error::SourceReadFailure { offset, source } => write!(
                f,
                "reading source for chunk {:?} failed: {source}",
                offset.to_array()
            ),
            Error::TargetWriteFailure { offset, source } => write!(
                f,
                "writing chunk {:?} failed: {source}",
                offset.to_array()
            ),
            Error::PlanningInconsistency(message) => {
                write!(f, "inconsistent downsampling plan: {message}")
            }
            Error::Cancelled { offset } => {
                write!(f, "job for chunk {:?} was cancelled", offset.to_array())
            }
            Error::LevelFailed {
                mag,
                failed,
                total,
                first,
            } => write!(
                f,
                "{failed} of {total} chunk jobs of mag {mag} failed, first error: {first}"
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceReadFailure { source, .. } | Error::TargetWriteFailure { source, .. } => {
                Some(source)
            }
            Error::LevelFailed { first, .. } => Some(first.as_ref()),
            _ => None,
        }
    }
}
