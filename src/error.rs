use std::path::PathBuf;

use asset_common::{AssetKey, AssetType};
use asset_importer::ImportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not import {path}")]
    Import {
        path: PathBuf,
        #[source]
        source: ImportError,
    },
    #[error("{0} has neither a default scene nor any meshes")]
    NoSceneOrMeshes(PathBuf),
    #[error("{path} has no scene {scene}")]
    MissingScene { path: PathBuf, scene: usize },
    #[error("assets of type {0:?} are not loaded from files")]
    UnsupportedAssetType(AssetType),
    #[error("no importer is registered for {0:?} assets")]
    NoImporter(AssetType),
    #[error("{0} contains no meshes")]
    NoMeshes(PathBuf),
    #[error("object {object} of {path} is its own ancestor")]
    HierarchyCycle { path: PathBuf, object: usize },
    #[error("unknown primitive template {0}")]
    UnknownPrimitive(String),
    #[error("could not build primitive {handle}")]
    Primitive {
        handle: String,
        #[source]
        source: ImportError,
    },
    #[error("a trajectory needs at least two distinct points")]
    TooFewPoints,
}

#[derive(Error, Debug)]
pub enum InstantiateError {
    #[error("asset {0} has not been loaded")]
    NotLoaded(AssetKey),
    #[error("{asset_type:?} asset {key} cannot be scaled")]
    UnsupportedScale { key: AssetKey, asset_type: AssetType },
    #[error("{asset_type:?} asset {key} only supports the no-lights setup")]
    UnsupportedLightSetup { key: AssetKey, asset_type: AssetType },
    #[error("atlas asset {0} can only be instanced as static geometry")]
    UnsupportedDynamicAtlas(AssetKey),
    #[error("unsupported instance flags: {0}")]
    UnsupportedFlags(&'static str),
    #[error("scene graph {0} does not exist")]
    MissingSceneGraph(usize),
    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Error, Debug)]
pub enum CollisionError {
    #[error("asset {0} has not been loaded")]
    NotLoaded(AssetKey),
    #[error("collision meshes are not supported for {asset_type:?} asset {key}")]
    UnsupportedMeshType { key: AssetKey, asset_type: AssetType },
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("failed to load the {role} mesh")]
    Load {
        role: &'static str,
        #[source]
        source: LoadError,
    },
    #[error("failed to instance the {role} mesh")]
    Instantiate {
        role: &'static str,
        #[source]
        source: InstantiateError,
    },
    #[error(transparent)]
    Collision(#[from] CollisionError),
    #[error("physics rejected the collision mesh of {0}")]
    PhysicsRejected(AssetKey),
    #[error("unknown primitive template {0}")]
    UnknownPrimitive(String),
}
