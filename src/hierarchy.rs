//! Local transform tree extracted from an importer's object graph.

use std::path::Path;

use asset_common::{ids::LocalId, scene::ObjectInstance};
use asset_importer::Importer;
use ultraviolet::Mat4;

use crate::LoadError;

pub type NodeIndex = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct MeshTransformNode {
    pub local_mesh_id: Option<LocalId>,
    pub local_material_id: Option<LocalId>,
    pub local_to_parent: Mat4,
    /// Importer object this node was built from.
    pub component_id: Option<usize>,
    pub children: Vec<NodeIndex>,
}

impl MeshTransformNode {
    pub fn new(local_to_parent: Mat4) -> Self {
        Self {
            local_mesh_id: None,
            local_material_id: None,
            local_to_parent,
            component_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, mesh: LocalId, material: Option<LocalId>) -> Self {
        self.local_mesh_id = Some(mesh);
        self.local_material_id = material;
        self
    }
}

impl Default for MeshTransformNode {
    fn default() -> Self {
        Self::new(Mat4::identity())
    }
}

/// Arena of nodes. Index 0 is the root.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformHierarchy {
    nodes: Vec<MeshTransformNode>,
}

impl TransformHierarchy {
    pub const ROOT: NodeIndex = 0;

    pub fn new(root: MeshTransformNode) -> Self {
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> &MeshTransformNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, index: NodeIndex) -> Option<&MeshTransformNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the root node exists from construction on.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Appends `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeIndex, node: MeshTransformNode) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(index);
        index
    }

    /// Applies `transform` on top of the root's local transform.
    pub fn prepend_to_root(&mut self, transform: Mat4) {
        let root = &mut self.nodes[Self::ROOT];
        root.local_to_parent = transform * root.local_to_parent;
    }

    /// Depth-first pre-order walk, handing each node its cumulative transform starting from
    /// `root_transform`.
    pub fn visit(&self, root_transform: Mat4, mut visitor: impl FnMut(&MeshTransformNode, Mat4)) {
        let mut stack = vec![(Self::ROOT, root_transform)];
        while let Some((index, parent)) = stack.pop() {
            let node = &self.nodes[index];
            let world = parent * node.local_to_parent;
            visitor(node, world);
            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }
}

/// Builds the hierarchy below `roots`. Materials are only kept when `with_materials` is set.
pub fn build_hierarchy(
    importer: &dyn Importer,
    path: &Path,
    roots: &[usize],
    with_materials: bool,
) -> Result<TransformHierarchy, LoadError> {
    let mut builder = HierarchyBuilder {
        importer,
        path,
        with_materials,
        hierarchy: TransformHierarchy::new(MeshTransformNode::default()),
        ancestors: Vec::new(),
    };
    for &object in roots {
        builder.add_object(TransformHierarchy::ROOT, object)?;
    }
    Ok(builder.hierarchy)
}

struct HierarchyBuilder<'a> {
    importer: &'a dyn Importer,
    path: &'a Path,
    with_materials: bool,
    hierarchy: TransformHierarchy,
    ancestors: Vec<usize>,
}

impl HierarchyBuilder<'_> {
    fn add_object(&mut self, parent: NodeIndex, object: usize) -> Result<(), LoadError> {
        if self.ancestors.contains(&object) {
            return Err(LoadError::HierarchyCycle {
                path: self.path.to_path_buf(),
                object,
            });
        }
        let Some(data) = self.importer.object3d(object) else {
            log::error!(
                "Could not load object {} of {}, skipping it and its children",
                object,
                self.path.display()
            );
            return Ok(());
        };

        let mut node = MeshTransformNode::new(data.transform);
        node.component_id = Some(object);
        if let ObjectInstance::Mesh { mesh, material } = data.instance {
            node.local_mesh_id = Some(mesh);
            if self.with_materials {
                node.local_material_id = material;
            }
        }
        let index = self.hierarchy.add_child(parent, node);

        self.ancestors.push(object);
        for child in data.children {
            self.add_object(index, child)?;
        }
        self.ancestors.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_common::scene::{MeshData, ObjectData, RawMaterial, RawTexture, SceneData};
    use asset_importer::ImportError;
    use ultraviolet::Vec3;

    /// Serves only an object graph.
    struct Objects(Vec<ObjectData>);

    impl Importer for Objects {
        fn open_file(&mut self, _path: &Path) -> Result<(), ImportError> {
            Ok(())
        }
        fn mesh_count(&self) -> usize {
            0
        }
        fn material_count(&self) -> usize {
            0
        }
        fn texture_count(&self) -> usize {
            0
        }
        fn object_count(&self) -> usize {
            self.0.len()
        }
        fn mesh(&self, _index: usize) -> Option<MeshData> {
            None
        }
        fn material(&self, _index: usize) -> Option<RawMaterial> {
            None
        }
        fn texture(&self, _index: usize) -> Option<RawTexture> {
            None
        }
        fn object3d(&self, index: usize) -> Option<ObjectData> {
            self.0.get(index).cloned()
        }
        fn default_scene(&self) -> Option<usize> {
            None
        }
        fn scene(&self, _index: usize) -> Option<SceneData> {
            None
        }
    }

    #[test]
    fn cycles_are_rejected() {
        let importer = Objects(vec![
            ObjectData::empty(vec![1]),
            ObjectData::empty(vec![0]),
        ]);
        let result = build_hierarchy(&importer, Path::new("/c.glb"), &[0], true);
        assert!(matches!(
            result,
            Err(LoadError::HierarchyCycle { object: 0, .. })
        ));
    }

    #[test]
    fn missing_objects_drop_only_their_subtree() {
        let importer = Objects(vec![
            ObjectData::empty(vec![7, 2, 1]),
            ObjectData::mesh(1, Some(4), Mat4::identity()),
            ObjectData::mesh(0, Some(3), Mat4::identity()),
        ]);
        let hierarchy = build_hierarchy(&importer, Path::new("/a.glb"), &[0], false).unwrap();

        assert_eq!(hierarchy.len(), 4);
        assert!(!hierarchy.is_empty());
        let parent = hierarchy.node(hierarchy.root().children[0]).unwrap();
        let children: Vec<_> = parent
            .children
            .iter()
            .map(|&index| hierarchy.node(index).unwrap())
            .collect();
        assert_eq!(
            children.iter().map(|node| node.component_id).collect::<Vec<_>>(),
            vec![Some(2), Some(1)]
        );
        assert_eq!(children[0].local_mesh_id, Some(0));
        assert!(children.iter().all(|node| node.local_material_id.is_none()));
    }

    #[test]
    fn visit_accumulates_transforms_in_preorder() {
        let mut hierarchy = TransformHierarchy::new(MeshTransformNode::new(
            Mat4::from_translation(Vec3::unit_x()),
        ));
        let a = hierarchy.add_child(
            TransformHierarchy::ROOT,
            MeshTransformNode::new(Mat4::from_translation(Vec3::unit_y())).with_mesh(0, None),
        );
        hierarchy.add_child(a, MeshTransformNode::default().with_mesh(1, None));
        hierarchy.add_child(TransformHierarchy::ROOT, MeshTransformNode::default());

        let mut seen = Vec::new();
        hierarchy.visit(Mat4::identity(), |node, world| {
            seen.push((node.local_mesh_id, world.transform_point3(Vec3::zero())));
        });
        assert_eq!(
            seen,
            vec![
                (None, Vec3::unit_x()),
                (Some(0), Vec3::new(1.0, 1.0, 0.0)),
                (Some(1), Vec3::new(1.0, 1.0, 0.0)),
                (None, Vec3::unit_x()),
            ]
        );
    }

    #[test]
    fn frame_rotation_is_applied_before_the_root_transform() {
        let mut hierarchy = TransformHierarchy::new(MeshTransformNode::new(
            Mat4::from_translation(Vec3::unit_z()),
        ));
        hierarchy.prepend_to_root(Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let moved = hierarchy.root().local_to_parent.transform_point3(Vec3::zero());
        assert!((moved - Vec3::new(0.0, -1.0, 0.0)).mag() < 1.0e-5);
    }
}
