//! Builds the resolution pyramid ("mags") of a chunked voxel layer.
//!
//! A run plans the mags to create, pads every level so that it divides exactly into the coarsest
//! mag, and then downsamples one level after the other with independent chunk jobs.

pub mod alignment;
pub mod error;
pub mod interpolation;
pub mod job;
pub mod layer;
pub mod mag;
pub mod timing;

pub use alignment::{align_with_mag, AlignmentPlan, AlignmentPlanner};
pub use error::Error;
pub use interpolation::{downsample_cube, InterpolationEngine, InterpolationMode};
pub use job::{ChunkedDownsampleJob, Job, JobExecutor, RayonExecutor, SequentialExecutor};
pub use layer::{
    DownsampleReport, DownsampleSettings, Layer, LayerCategory, LevelReport, PyramidLevel,
};
pub use mag::{next_mag, MagLevel, ResolutionPyramidPlanner};
pub use timing::{ChunkReport, JobMonitor, LogMonitor, NoopMonitor, Span};

pub use voxel_store;
