//! Turns cached assets into scene graph subtrees.

use asset_common::{
    bounds::Aabb,
    ids::{IdRange, MaterialId, MeshId},
    AssetKey, AssetType,
};
use bitflags::bitflags;
use ultraviolet::{Mat4, Vec3};

use crate::{
    hierarchy::{NodeIndex, TransformHierarchy},
    material::{MaterialKey, ShadingKind},
    mesh::{MeshAttributeFlags, MeshResource},
    scene_graph::{
        Drawable, DrawableGroupId, DrawableMesh, LightSetupKey, NodeId, NodeType, SceneGraph,
    },
    InstantiateError, LoadedAssetData, ResourceManager,
};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct InstanceFlags: u8 {
        /// Never moves. Gets absolute bounding boxes and stays an empty node type.
        const STATIC = 1;
        /// Drawn into the semantic scene graph.
        const SEMANTIC = 1 << 1;
        /// Drawn into the color and depth scene graph.
        const RGBD = 1 << 2;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderAssetInstanceCreationInfo {
    pub key: AssetKey,
    pub scale: Option<Vec3>,
    pub flags: InstanceFlags,
    pub light_setup: LightSetupKey,
}

impl RenderAssetInstanceCreationInfo {
    pub fn new(key: AssetKey, flags: InstanceFlags, light_setup: LightSetupKey) -> Self {
        Self {
            key,
            scale: None,
            flags,
            light_setup,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(InstanceFlags::STATIC)
    }

    pub fn is_semantic(&self) -> bool {
        self.flags.contains(InstanceFlags::SEMANTIC)
    }

    pub fn is_rgbd(&self) -> bool {
        self.flags.contains(InstanceFlags::RGBD)
    }
}

/// State shared by the recursive walk over a general asset's hierarchy.
struct ComponentBuilder<'a> {
    data: &'a LoadedAssetData,
    group: DrawableGroupId,
    light_setup: &'a LightSetupKey,
    vis_node_cache: &'a mut Vec<NodeId>,
    static_drawables: Option<Vec<(NodeId, MeshId)>>,
}

impl ResourceManager {
    /// Instances the cached asset `creation.key` below `parent` and returns the instance root.
    ///
    /// Every node created for a general asset is appended to `vis_node_cache`. Instance and
    /// atlas meshes leave it alone.
    pub fn create_render_asset_instance(
        &self,
        creation: &RenderAssetInstanceCreationInfo,
        parent: NodeId,
        graph: &mut dyn SceneGraph,
        group: DrawableGroupId,
        vis_node_cache: Option<&mut Vec<NodeId>>,
    ) -> Result<NodeId, InstantiateError> {
        let data = self
            .resource_dict
            .get(&creation.key)
            .ok_or_else(|| InstantiateError::NotLoaded(creation.key.clone()))?;
        self.is_light_setup_compatible(data, &creation.light_setup);

        match data.info.asset_type {
            AssetType::Unknown | AssetType::GeneralMesh | AssetType::Primitive => {
                let mut scratch = Vec::new();
                let vis_node_cache = vis_node_cache.unwrap_or(&mut scratch);
                Ok(self.instance_general(creation, data, parent, graph, group, vis_node_cache))
            }
            AssetType::InstanceMesh => {
                self.instance_instance_mesh(creation, data, parent, graph, group)
            }
            AssetType::AtlasMesh => self.instance_atlas(creation, data, parent, graph, group),
        }
    }

    fn instance_general(
        &self,
        creation: &RenderAssetInstanceCreationInfo,
        data: &LoadedAssetData,
        parent: NodeId,
        graph: &mut dyn SceneGraph,
        group: DrawableGroupId,
        vis_node_cache: &mut Vec<NodeId>,
    ) -> NodeId {
        let instance_root = graph.create_child(parent);
        if let Some(scale) = creation.scale {
            // a separate node, physics will overwrite the transform of the parent
            graph.set_scaling(instance_root, scale);
            vis_node_cache.push(instance_root);
        }

        let mut builder = ComponentBuilder {
            data,
            group,
            light_setup: &creation.light_setup,
            vis_node_cache,
            static_drawables: creation.is_static().then(Vec::new),
        };
        self.add_component(&mut builder, graph, TransformHierarchy::ROOT, instance_root);

        match builder.static_drawables.take() {
            Some(static_drawables) => self.compute_absolute_aabbs(graph, &static_drawables),
            None => {
                for &node in builder.vis_node_cache.iter() {
                    graph.set_node_type(node, NodeType::Object);
                }
            }
        }
        instance_root
    }

    fn add_component(
        &self,
        builder: &mut ComponentBuilder<'_>,
        graph: &mut dyn SceneGraph,
        index: NodeIndex,
        parent: NodeId,
    ) {
        let data = builder.data;
        let Some(transform_node) = data.hierarchy.node(index) else {
            return;
        };
        let node = graph.create_child(parent);
        builder.vis_node_cache.push(node);
        graph.set_transformation(node, transform_node.local_to_parent);

        if let Some(local_mesh) = transform_node.local_mesh_id {
            let mesh = data
                .mesh_ids
                .and_then(|range| range.global(local_mesh))
                .and_then(|id| self.store.meshes.get(id).map(|mesh| (id, mesh)));
            match mesh {
                Some((mesh_id, mesh)) => {
                    let material = self.resolve_material(
                        transform_node.local_material_id,
                        data.material_ids,
                    );
                    let drawable = Drawable {
                        mesh: DrawableMesh::Mesh(mesh_id),
                        material,
                        light_setup: builder.light_setup.clone(),
                        shading: self.shading_of(material),
                        attributes: mesh.attribute_flags(),
                    };
                    graph.add_drawable(node, drawable, builder.group);
                    if let Some(static_drawables) = builder.static_drawables.as_mut() {
                        static_drawables.push((node, mesh_id));
                    }
                    graph.set_mesh_bb(node, mesh.bounds());
                }
                None => log::warn!(
                    "Mesh {} of {} was not loaded, skipping its drawable",
                    local_mesh,
                    data.info.filepath
                ),
            }
        }

        for &child in &transform_node.children {
            self.add_component(builder, graph, child, node);
        }
    }

    /// Falls back to the default material when the node has none, the asset loaded no
    /// materials or the material was skipped during loading.
    fn resolve_material(
        &self,
        local: Option<usize>,
        range: Option<IdRange<MaterialId>>,
    ) -> MaterialKey {
        match local.zip(range).and_then(|(local, range)| range.global(local)) {
            Some(id) if self.store.materials.contains_key(&MaterialKey::Id(id)) => {
                MaterialKey::Id(id)
            }
            Some(id) => {
                log::debug!("Material {} was skipped, using the default material", id);
                MaterialKey::Default
            }
            None => MaterialKey::Default,
        }
    }

    fn shading_of(&self, material: MaterialKey) -> ShadingKind {
        self.store
            .materials
            .get(&material)
            .map_or(ShadingKind::Phong, |material| material.shading)
    }

    fn instance_instance_mesh(
        &self,
        creation: &RenderAssetInstanceCreationInfo,
        data: &LoadedAssetData,
        parent: NodeId,
        graph: &mut dyn SceneGraph,
        group: DrawableGroupId,
    ) -> Result<NodeId, InstantiateError> {
        self.check_unlit_unscaled(creation, data)?;
        let Some(mesh_ids) = data.mesh_ids else {
            return Err(InstantiateError::NotLoaded(creation.key.clone()));
        };
        let root_transform = data.hierarchy.root().local_to_parent;

        let instance_root = graph.create_child(parent);
        let mut static_drawables = Vec::new();
        for mesh_id in mesh_ids.iter() {
            let node = graph.create_child(instance_root);
            graph.set_transformation(node, root_transform);
            graph.add_drawable(
                node,
                Drawable {
                    mesh: DrawableMesh::Mesh(mesh_id),
                    material: MaterialKey::PerVertexObjectId,
                    light_setup: LightSetupKey::NoLights,
                    shading: self.shading_of(MaterialKey::PerVertexObjectId),
                    attributes: MeshAttributeFlags::empty(),
                },
                group,
            );
            if creation.is_static() {
                static_drawables.push((node, mesh_id));
            }
        }
        self.compute_absolute_aabbs(graph, &static_drawables);
        Ok(instance_root)
    }

    fn instance_atlas(
        &self,
        creation: &RenderAssetInstanceCreationInfo,
        data: &LoadedAssetData,
        parent: NodeId,
        graph: &mut dyn SceneGraph,
        group: DrawableGroupId,
    ) -> Result<NodeId, InstantiateError> {
        self.check_unlit_unscaled(creation, data)?;
        if !creation.is_static() {
            return Err(InstantiateError::UnsupportedDynamicAtlas(
                creation.key.clone(),
            ));
        }
        let atlas = data
            .mesh_ids
            .and_then(|range| self.store.meshes.get(range.first).map(|mesh| (range.first, mesh)));
        let Some((mesh_id, MeshResource::Atlas(atlas))) = atlas else {
            return Err(InstantiateError::NotLoaded(creation.key.clone()));
        };
        let root_transform = data.hierarchy.root().local_to_parent;

        let instance_root = graph.create_child(parent);
        let nodes: Vec<NodeId> = (0..atlas.submeshes.len())
            .map(|submesh| {
                let node = graph.create_child(instance_root);
                graph.set_transformation(node, root_transform);
                graph.add_drawable(
                    node,
                    Drawable {
                        mesh: DrawableMesh::AtlasSubmesh {
                            mesh: mesh_id,
                            submesh,
                        },
                        material: MaterialKey::Default,
                        light_setup: LightSetupKey::NoLights,
                        shading: ShadingKind::Flat,
                        attributes: MeshAttributeFlags::empty(),
                    },
                    group,
                );
                node
            })
            .collect();

        let transforms = graph.absolute_transformations(&nodes);
        for ((node, submesh), transform) in nodes.iter().zip(&atlas.submeshes).zip(transforms) {
            graph.set_absolute_aabb(
                *node,
                Aabb::from_transformed_points(&transform, &submesh.data.positions),
            );
        }
        Ok(instance_root)
    }

    fn check_unlit_unscaled(
        &self,
        creation: &RenderAssetInstanceCreationInfo,
        data: &LoadedAssetData,
    ) -> Result<(), InstantiateError> {
        if creation.scale.is_some() {
            return Err(InstantiateError::UnsupportedScale {
                key: creation.key.clone(),
                asset_type: data.info.asset_type,
            });
        }
        if creation.light_setup != LightSetupKey::NoLights {
            return Err(InstantiateError::UnsupportedLightSetup {
                key: creation.key.clone(),
                asset_type: data.info.asset_type,
            });
        }
        Ok(())
    }

    /// Stores the world space bounds of every static drawable on its node. All transforms
    /// are computed in one batch.
    fn compute_absolute_aabbs(
        &self,
        graph: &mut dyn SceneGraph,
        static_drawables: &[(NodeId, MeshId)],
    ) {
        if static_drawables.is_empty() {
            return;
        }
        let nodes: Vec<NodeId> = static_drawables.iter().map(|(node, _)| *node).collect();
        let transforms: Vec<Mat4> = graph.absolute_transformations(&nodes);
        for ((node, mesh_id), transform) in static_drawables.iter().zip(transforms) {
            match self.store.meshes.get(*mesh_id) {
                Some(mesh) => graph.set_absolute_aabb(
                    *node,
                    Aabb::from_transformed_points(&transform, mesh.positions()),
                ),
                None => log::error!("Mesh {} is missing, no absolute bounds for it", mesh_id),
            }
        }
    }
}
