pub mod scene;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    path::{Component, Path, PathBuf},
};

use crate::frame::CoordinateFrame;

/// File path that stands for "no mesh at all" in stage descriptions.
pub const EMPTY_SCENE: &str = "NONE";

/// Semantic family of an asset, selects both the loader and the instancing strategy.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum AssetType {
    /// Treated like a general mesh.
    #[default]
    Unknown,
    /// Hierarchical scene mesh (glTF, OBJ, ...).
    GeneralMesh,
    /// Flat point-cloud style mesh with per-vertex object ids.
    InstanceMesh,
    /// Single mesh split into sub-meshes sharing a texture atlas.
    AtlasMesh,
    /// Procedurally generated geometry.
    Primitive,
}

impl AssetType {
    pub fn is_general(self) -> bool {
        matches!(self, AssetType::Unknown | AssetType::GeneralMesh)
    }
}

/// Describes how an asset file should be loaded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AssetInfo {
    pub asset_type: AssetType,
    pub filepath: String,
    pub frame: CoordinateFrame,
    pub unit_scale: f32,
    pub requires_lighting: bool,
    /// Only meaningful for instance meshes.
    pub split_instance_mesh: bool,
}

impl AssetInfo {
    pub fn new(asset_type: AssetType, filepath: impl Into<String>) -> Self {
        Self {
            asset_type,
            filepath: filepath.into(),
            frame: CoordinateFrame::default(),
            unit_scale: 1.0,
            requires_lighting: false,
            split_instance_mesh: false,
        }
    }

    /// Descriptor for generated assets, which have no file behind them.
    pub fn primitive() -> Self {
        Self {
            requires_lighting: true,
            ..Self::new(AssetType::Primitive, "")
        }
    }

    pub fn with_frame(mut self, frame: CoordinateFrame) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_unit_scale(mut self, unit_scale: f32) -> Self {
        self.unit_scale = unit_scale;
        self
    }

    pub fn with_requires_lighting(mut self, requires_lighting: bool) -> Self {
        self.requires_lighting = requires_lighting;
        self
    }

    pub fn with_split_instance_mesh(mut self, split: bool) -> Self {
        self.split_instance_mesh = split;
        self
    }

    pub fn key(&self) -> AssetKey {
        AssetKey::from_path(&self.filepath)
    }

    pub fn is_empty_scene(&self) -> bool {
        self.filepath == EMPTY_SCENE
    }

    /// Same key and same load settings, however the path was spelled.
    pub fn loads_like(&self, other: &AssetInfo) -> bool {
        self.key() == other.key()
            && Self {
                filepath: other.filepath.clone(),
                ..self.clone()
            } == *other
    }
}

/// Identity under which a loaded asset is cached.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct AssetKey(String);

impl AssetKey {
    /// Lexically normalized absolute path. Does not touch the file system, so missing files
    /// still get a stable key.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|dir| dir.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };

        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        Self(normalized.to_string_lossy().into_owned())
    }

    /// Key for generated assets (primitives, trajectories). Collisions with file keys are
    /// the caller's problem.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&AssetInfo> for AssetKey {
    fn from(info: &AssetInfo) -> Self {
        info.key()
    }
}
