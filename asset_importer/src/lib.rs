mod gltf_importer;
mod importer;
pub mod instance_mesh;
pub mod primitive;

pub use gltf_importer::*;
pub use importer::*;
