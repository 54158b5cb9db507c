use std::path::{Path, PathBuf};

use asset_common::scene::{MeshData, ObjectData, RawMaterial, RawTexture, SceneData};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("file {0} does not exist")]
    NotFound(PathBuf),
    #[error("failed to import {path}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("unknown primitive {0}")]
    UnknownPrimitive(String),
    #[error("primitive template {0} has invalid parameters")]
    InvalidTemplate(String),
}

/// Format specific scene reader. After a successful [`Importer::open_file`] the importer exposes
/// flat lists of meshes, materials, textures and objects, all addressed by local index.
///
/// Missing items are `None` and callers skip them.
pub trait Importer {
    fn open_file(&mut self, path: &Path) -> Result<(), ImportError>;

    fn close(&mut self) {}

    fn mesh_count(&self) -> usize;
    fn material_count(&self) -> usize;
    fn texture_count(&self) -> usize;
    fn object_count(&self) -> usize;

    fn mesh(&self, index: usize) -> Option<MeshData>;
    fn material(&self, index: usize) -> Option<RawMaterial>;
    fn texture(&self, index: usize) -> Option<RawTexture>;
    fn object3d(&self, index: usize) -> Option<ObjectData>;

    fn object3d_name(&self, index: usize) -> Option<String> {
        self.object3d(index).and_then(|object| object.name)
    }

    fn default_scene(&self) -> Option<usize>;
    fn scene(&self, index: usize) -> Option<SceneData>;
}
