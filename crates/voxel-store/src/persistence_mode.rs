use serde::{Deserialize, Serialize};

/// How a store may be accessed. Uses the zarr mode strings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistenceMode {
    #[serde(rename = "r")]
    ReadOnly,

    #[default]
    #[serde(rename = "r+")]
    ReadWrite,
}

impl PersistenceMode {
    pub fn is_writable(&self) -> bool {
        matches!(self, PersistenceMode::ReadWrite)
    }
}
