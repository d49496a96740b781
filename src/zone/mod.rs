//! Zone data: the bundled dataset and the registry built over it

pub mod dataset;
pub mod registry;

pub use dataset::{Zone, ZoneDataset};
pub use registry::{TldRegistry, ZoneIndex};
