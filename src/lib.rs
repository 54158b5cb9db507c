pub mod collision;
pub mod config_loader;
pub mod error;
pub mod gpu;
pub mod hierarchy;
pub mod importers;
pub mod instancer;
pub mod material;
pub mod mesh;
pub mod physics;
pub mod registry;
pub mod resource_manager;
pub mod scene_graph;
pub mod stage;

pub use error::*;
pub use resource_manager::{LoadOutcome, LoadedAssetData, ResourceManager};
