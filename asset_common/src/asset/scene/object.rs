use serde::{Deserialize, Serialize};
use ultraviolet::Mat4;

use crate::ids::LocalId;

/// What an importer node carries besides its transform.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ObjectInstance {
    #[default]
    Empty,
    Mesh {
        mesh: LocalId,
        material: Option<LocalId>,
    },
    Light,
    Camera,
}

/// One node of an importer's object graph. Children are object indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    pub name: Option<String>,
    pub transform: Mat4,
    pub instance: ObjectInstance,
    pub children: Vec<usize>,
}

impl ObjectData {
    pub fn new(transform: Mat4, instance: ObjectInstance, children: Vec<usize>) -> Self {
        Self {
            name: None,
            transform,
            instance,
            children,
        }
    }

    pub fn empty(children: Vec<usize>) -> Self {
        Self::new(Mat4::identity(), ObjectInstance::Empty, children)
    }

    pub fn mesh(mesh: LocalId, material: Option<LocalId>, transform: Mat4) -> Self {
        Self::new(
            transform,
            ObjectInstance::Mesh { mesh, material },
            Vec::new(),
        )
    }

    pub fn with_children(mut self, children: Vec<usize>) -> Self {
        self.children = children;
        self
    }
}

/// Top level objects of one scene.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    pub children: Vec<usize>,
}
