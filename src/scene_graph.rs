//! Scene graph seam used by the instancer, plus an arena backed implementation.

use asset_common::{
    bounds::Aabb,
    ids::{MeshId, PrimitiveMeshId},
};
use serde::{Deserialize, Serialize};
use ultraviolet::{Mat4, Vec3};

use crate::{
    material::{MaterialKey, ShadingKind},
    mesh::MeshAttributeFlags,
};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DrawableGroupId(usize);

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum NodeType {
    #[default]
    Empty,
    /// Node belongs to a movable object and is skipped by static scene passes.
    Object,
}

/// Light setup a drawable is shaded with.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum LightSetupKey {
    NoLights,
    #[default]
    Default,
    Named(String),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DrawableMesh {
    Mesh(MeshId),
    AtlasSubmesh { mesh: MeshId, submesh: usize },
    Primitive(PrimitiveMeshId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Drawable {
    pub mesh: DrawableMesh,
    pub material: MaterialKey,
    pub light_setup: LightSetupKey,
    pub shading: ShadingKind,
    pub attributes: MeshAttributeFlags,
}

/// What the instancer needs from a scene graph. Node handles are only meaningful for the
/// graph that created them.
pub trait SceneGraph {
    fn root(&self) -> NodeId;
    fn default_drawables(&self) -> DrawableGroupId;

    fn create_child(&mut self, parent: NodeId) -> NodeId;
    fn set_transformation(&mut self, node: NodeId, transformation: Mat4);
    fn set_scaling(&mut self, node: NodeId, scaling: Vec3);
    fn set_node_type(&mut self, node: NodeId, node_type: NodeType);
    fn add_drawable(&mut self, node: NodeId, drawable: Drawable, group: DrawableGroupId);
    fn set_mesh_bb(&mut self, node: NodeId, bounds: Aabb);
    fn set_absolute_aabb(&mut self, node: NodeId, bounds: Aabb);

    /// Local to world transforms of all `nodes`, in order.
    fn absolute_transformations(&self, nodes: &[NodeId]) -> Vec<Mat4>;
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transformation: Mat4,
    pub scaling: Vec3,
    pub node_type: NodeType,
    pub mesh_bb: Option<Aabb>,
    pub absolute_aabb: Option<Aabb>,
}

impl SceneNode {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            transformation: Mat4::identity(),
            scaling: Vec3::one(),
            node_type: NodeType::Empty,
            mesh_bb: None,
            absolute_aabb: None,
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.transformation * Mat4::from_nonuniform_scale(self.scaling)
    }
}

/// Scene graph that keeps all nodes in one vector. Nodes are never removed.
#[derive(Debug)]
pub struct ArenaSceneGraph {
    nodes: Vec<SceneNode>,
    drawable_groups: Vec<Vec<(NodeId, Drawable)>>,
}

impl ArenaSceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode::new(None)],
            drawable_groups: vec![Vec::new()],
        }
    }

    pub fn create_drawable_group(&mut self) -> DrawableGroupId {
        self.drawable_groups.push(Vec::new());
        DrawableGroupId(self.drawable_groups.len() - 1)
    }

    pub fn node(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(node.0)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn drawables(&self, group: DrawableGroupId) -> &[(NodeId, Drawable)] {
        self.drawable_groups
            .get(group.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Drawables attached to `node`, from every group.
    pub fn drawables_of(&self, node: NodeId) -> impl Iterator<Item = &Drawable> {
        self.drawable_groups
            .iter()
            .flatten()
            .filter(move |(owner, _)| *owner == node)
            .map(|(_, drawable)| drawable)
    }

    fn absolute_transformation(&self, node: NodeId) -> Mat4 {
        let mut matrix = Mat4::identity();
        let mut current = Some(node);
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            matrix = node.local_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }
}

impl Default for ArenaSceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph for ArenaSceneGraph {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn default_drawables(&self) -> DrawableGroupId {
        DrawableGroupId(0)
    }

    fn create_child(&mut self, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode::new(Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn set_transformation(&mut self, node: NodeId, transformation: Mat4) {
        self.nodes[node.0].transformation = transformation;
    }

    fn set_scaling(&mut self, node: NodeId, scaling: Vec3) {
        self.nodes[node.0].scaling = scaling;
    }

    fn set_node_type(&mut self, node: NodeId, node_type: NodeType) {
        self.nodes[node.0].node_type = node_type;
    }

    fn add_drawable(&mut self, node: NodeId, drawable: Drawable, group: DrawableGroupId) {
        match self.drawable_groups.get_mut(group.0) {
            Some(drawables) => drawables.push((node, drawable)),
            None => log::error!("Drawable group {:?} does not exist", group),
        }
    }

    fn set_mesh_bb(&mut self, node: NodeId, bounds: Aabb) {
        self.nodes[node.0].mesh_bb = Some(bounds);
    }

    fn set_absolute_aabb(&mut self, node: NodeId, bounds: Aabb) {
        self.nodes[node.0].absolute_aabb = Some(bounds);
    }

    fn absolute_transformations(&self, nodes: &[NodeId]) -> Vec<Mat4> {
        nodes
            .iter()
            .map(|&node| self.absolute_transformation(node))
            .collect()
    }
}
