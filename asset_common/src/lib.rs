mod asset;
pub mod bounds;
pub mod frame;
pub mod gpu;
pub mod ids;
pub mod transform;

pub use asset::*;
