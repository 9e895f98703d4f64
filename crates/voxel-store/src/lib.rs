//! Storage-side types for chunked voxel datasets: element types, voxel buffers, bounding boxes,
//! and the `VoxelStore` handle through which a pyramid level is read and written.

pub mod bounding_box;
pub mod data_type;
pub mod error;
pub mod extent;
pub mod persistence_mode;
pub mod raw;
pub mod store;

pub use bounding_box::BoundingBox;
pub use data_type::{Element, ElementType};
pub use error::StoreError;
pub use persistence_mode::PersistenceMode;
pub use raw::{Cube, RawArray};
pub use store::{MemoryStore, StoreOptions, VoxelStore};
