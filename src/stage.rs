//! Stage loading and routing of instances to the color and semantic scene graphs.

use std::path::Path;

use asset_common::{frame::CoordinateFrame, AssetInfo, AssetKey, AssetType, EMPTY_SCENE};
use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

use crate::{
    instancer::{InstanceFlags, RenderAssetInstanceCreationInfo},
    physics::PhysicsBackend,
    scene_graph::{ArenaSceneGraph, LightSetupKey, NodeId, SceneGraph},
    InstantiateError, LoadError, ResourceManager, StageError,
};

/// Owns every scene graph of a simulation. Graphs are addressed by the index
/// [`SceneManager::init_scene_graph`] returned.
#[derive(Debug, Default)]
pub struct SceneManager {
    graphs: Vec<ArenaSceneGraph>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_scene_graph(&mut self) -> usize {
        self.graphs.push(ArenaSceneGraph::new());
        self.graphs.len() - 1
    }

    pub fn scene_graph(&self, id: usize) -> Option<&ArenaSceneGraph> {
        self.graphs.get(id)
    }

    pub fn scene_graph_mut(&mut self, id: usize) -> Option<&mut ArenaSceneGraph> {
        self.graphs.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

/// The scene graphs color/depth and semantic instances go to. Both point at the same graph
/// unless a separate semantic graph was created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActiveSceneIds {
    pub rgbd: usize,
    pub semantic: usize,
}

impl ActiveSceneIds {
    pub fn single(id: usize) -> Self {
        Self {
            rgbd: id,
            semantic: id,
        }
    }

    pub fn has_separate_semantic(&self) -> bool {
        self.rgbd != self.semantic
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageAttributes {
    pub handle: String,
    /// `"NONE"` loads an empty stage.
    pub render_asset: String,
    pub render_asset_type: AssetType,
    /// Empty for stages without a semantic mesh.
    pub semantic_asset: String,
    pub semantic_asset_type: AssetType,
    /// Empty to collide with the render mesh.
    pub collision_asset: String,
    pub collision_asset_type: AssetType,
    pub up: Vec3,
    pub front: Vec3,
    pub origin: Vec3,
    pub unit_scale: f32,
    pub requires_lighting: bool,
    /// Static semantic instances and split instance meshes, for culling.
    pub frustum_culling: bool,
    pub light_setup: LightSetupKey,
}

impl Default for StageAttributes {
    fn default() -> Self {
        Self {
            handle: "stage".to_owned(),
            render_asset: EMPTY_SCENE.to_owned(),
            render_asset_type: AssetType::Unknown,
            semantic_asset: String::new(),
            semantic_asset_type: AssetType::InstanceMesh,
            collision_asset: String::new(),
            collision_asset_type: AssetType::Unknown,
            up: Vec3::unit_y(),
            front: -Vec3::unit_z(),
            origin: Vec3::zero(),
            unit_scale: 1.0,
            requires_lighting: false,
            frustum_culling: true,
            light_setup: LightSetupKey::NoLights,
        }
    }
}

struct StageAssetInfos {
    render: AssetInfo,
    collision: Option<AssetInfo>,
    semantic: Option<AssetInfo>,
}

impl StageAttributes {
    pub fn frame(&self) -> CoordinateFrame {
        CoordinateFrame::from_up_front_or_default(self.up, self.front, self.origin)
    }

    fn asset_infos(&self, with_collision: bool, with_semantic: bool) -> StageAssetInfos {
        let frame = self.frame();
        let info = |asset_type, path: &str| {
            AssetInfo::new(asset_type, path)
                .with_frame(frame)
                .with_unit_scale(self.unit_scale)
        };

        StageAssetInfos {
            render: info(self.render_asset_type, &self.render_asset)
                .with_requires_lighting(self.requires_lighting),
            collision: (with_collision && !self.collision_asset.is_empty())
                .then(|| info(self.collision_asset_type, &self.collision_asset)),
            semantic: (with_semantic && !self.semantic_asset.is_empty()).then(|| {
                info(self.semantic_asset_type, &self.semantic_asset)
                    .with_split_instance_mesh(self.frustum_culling)
            }),
        }
    }
}

/// Template of a physical object. Render and collision assets are either files or
/// primitive template handles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectAttributes {
    pub handle: String,
    pub render_asset: String,
    pub render_asset_is_primitive: bool,
    /// Empty to collide with the render asset.
    pub collision_asset: String,
    pub collision_asset_is_primitive: bool,
    pub requires_lighting: bool,
    pub scale: Vec3,
}

impl Default for ObjectAttributes {
    fn default() -> Self {
        Self {
            handle: String::new(),
            render_asset: String::new(),
            render_asset_is_primitive: false,
            collision_asset: String::new(),
            collision_asset_is_primitive: false,
            requires_lighting: true,
            scale: Vec3::one(),
        }
    }
}

impl ObjectAttributes {
    pub fn render_key(&self) -> AssetKey {
        if self.render_asset_is_primitive {
            AssetKey::synthetic(&self.render_asset)
        } else {
            AssetKey::from_path(&self.render_asset)
        }
    }

    /// Collision asset path and whether it names a primitive.
    pub fn collision_asset(&self) -> (&str, bool) {
        if self.collision_asset.is_empty() {
            (&self.render_asset, self.render_asset_is_primitive)
        } else {
            (&self.collision_asset, self.collision_asset_is_primitive)
        }
    }

    pub fn light_setup(&self) -> LightSetupKey {
        if self.requires_lighting {
            LightSetupKey::Default
        } else {
            LightSetupKey::NoLights
        }
    }
}

impl ResourceManager {
    /// Loads the semantic, render and collision meshes of a stage and hands the collision
    /// geometry to `physics`.
    ///
    /// A missing semantic file is skipped. Every other failure aborts the stage.
    /// `active_scene_ids.semantic` is updated once the semantic mesh is in place.
    pub fn load_stage(
        &mut self,
        attributes: &StageAttributes,
        physics: Option<&mut dyn PhysicsBackend>,
        scenes: &mut SceneManager,
        active_scene_ids: &mut ActiveSceneIds,
        create_semantic_mesh: bool,
        force_separate_semantic_scene_graph: bool,
    ) -> Result<(), StageError> {
        let infos = attributes.asset_infos(physics.is_some(), create_semantic_mesh);

        let mut semantic_scene = active_scene_ids.rgbd;
        match &infos.semantic {
            Some(semantic) if Path::new(&semantic.filepath).exists() => {
                log::info!("Loading semantic stage mesh {}", semantic.filepath);
                semantic_scene = scenes.init_scene_graph();
                let mut flags = InstanceFlags::SEMANTIC;
                if attributes.frustum_culling {
                    flags |= InstanceFlags::STATIC;
                }
                let creation = RenderAssetInstanceCreationInfo::new(
                    semantic.key(),
                    flags,
                    LightSetupKey::NoLights,
                );
                self.load_stage_mesh(
                    semantic,
                    Some((&creation, &mut *scenes, semantic_scene)),
                    "semantic",
                )?;
            }
            Some(semantic) => log::warn!(
                "Semantic stage mesh {} does not exist, not loading it",
                semantic.filepath
            ),
            None => log::info!("Not loading a semantic stage mesh"),
        }

        if force_separate_semantic_scene_graph && semantic_scene == active_scene_ids.rgbd {
            semantic_scene = scenes.init_scene_graph();
        }
        active_scene_ids.semantic = semantic_scene;

        let mut flags = InstanceFlags::STATIC | InstanceFlags::RGBD;
        if !active_scene_ids.has_separate_semantic() {
            flags |= InstanceFlags::SEMANTIC;
        }
        let creation = RenderAssetInstanceCreationInfo::new(
            infos.render.key(),
            flags,
            attributes.light_setup.clone(),
        );
        self.load_stage_mesh(
            &infos.render,
            Some((&creation, &mut *scenes, active_scene_ids.rgbd)),
            "render",
        )?;

        let mut collision_info = &infos.render;
        if let Some(collision) = &infos.collision {
            self.load_stage_mesh(collision, None, "collision")?;
            if !collision.is_empty_scene() {
                collision_info = collision;
            }
        }

        if let Some(physics) = physics {
            if !collision_info.is_empty_scene() {
                let meshes = self.get_or_build_collision_group(&collision_info.key())?;
                let handle = AssetKey::synthetic(&attributes.handle);
                if !physics.add_stage(&handle, meshes) {
                    log::error!("Physics rejected stage {}", handle);
                    return Err(StageError::PhysicsRejected(handle));
                }
            }
        }
        Ok(())
    }

    /// Loads one stage mesh unless it is the empty scene and instances it when a target
    /// graph is given.
    fn load_stage_mesh(
        &mut self,
        info: &AssetInfo,
        target: Option<(&RenderAssetInstanceCreationInfo, &mut SceneManager, usize)>,
        role: &'static str,
    ) -> Result<(), StageError> {
        if info.is_empty_scene() {
            log::info!("Loading an empty {} stage", role);
            return Ok(());
        }
        self.load_asset(info).map_err(|source| {
            log::error!("Stage {} mesh {} failed to load", role, info.filepath);
            StageError::Load { role, source }
        })?;

        if let Some((creation, scenes, scene_id)) = target {
            self.instance_into(creation, scenes, scene_id)
                .map_err(|source| StageError::Instantiate { role, source })?;
        }
        Ok(())
    }

    fn instance_into(
        &self,
        creation: &RenderAssetInstanceCreationInfo,
        scenes: &mut SceneManager,
        scene_id: usize,
    ) -> Result<NodeId, InstantiateError> {
        let graph = scenes
            .scene_graph_mut(scene_id)
            .ok_or(InstantiateError::MissingSceneGraph(scene_id))?;
        let (root, group) = (graph.root(), graph.default_drawables());
        self.create_render_asset_instance(creation, root, graph, group, None)
    }

    /// Loads `info` if needed and instances it into the scene graph its flags select.
    ///
    /// Dynamic instances must be both semantic and color/depth. A static instance that is
    /// both needs a shared graph, one that is only one of them needs separate graphs.
    pub fn load_and_create_render_asset_instance(
        &mut self,
        info: &AssetInfo,
        creation: &RenderAssetInstanceCreationInfo,
        scenes: &mut SceneManager,
        active_scene_ids: &ActiveSceneIds,
    ) -> Result<NodeId, InstantiateError> {
        let scene_id = route_instance(creation, active_scene_ids).map_err(|error| {
            log::warn!("Cannot instance {}: {}", info.filepath, error);
            error
        })?;

        if !self.is_loaded(&info.key()) {
            self.load_asset(info)?;
        }
        self.instance_into(creation, scenes, scene_id)
    }

    /// Makes sure the render and collision assets of an object template are cached and its
    /// collision group is built.
    pub fn instantiate_assets_on_demand(
        &mut self,
        object: &ObjectAttributes,
    ) -> Result<(), StageError> {
        let mut render_loaded = false;
        if !self.is_loaded(&object.render_key()) {
            if object.render_asset_is_primitive {
                self.build_primitive_asset_from_handle(&object.render_asset)
                    .map_err(|error| match error {
                        LoadError::UnknownPrimitive(handle) => {
                            log::error!(
                                "No primitive template {} exists for object {}",
                                handle,
                                object.handle
                            );
                            StageError::UnknownPrimitive(handle)
                        }
                        source => StageError::Load {
                            role: "render",
                            source,
                        },
                    })?;
            } else {
                self.load_object_mesh(&object.render_asset, object.requires_lighting)
                    .map_err(|source| StageError::Load {
                        role: "render",
                        source,
                    })?;
                render_loaded = true;
            }
        }

        let (collision_asset, is_primitive) = object.collision_asset();
        if is_primitive || collision_asset.is_empty() {
            return Ok(());
        }
        let key = AssetKey::from_path(collision_asset);
        if !self.is_loaded(&key) {
            self.load_object_mesh(collision_asset, object.requires_lighting && !render_loaded)
                .map_err(|source| StageError::Load {
                    role: "collision",
                    source,
                })?;
        }
        self.get_or_build_collision_group(&key)?;
        Ok(())
    }

    fn load_object_mesh(&mut self, path: &str, requires_lighting: bool) -> Result<(), LoadError> {
        let info =
            AssetInfo::new(AssetType::Unknown, path).with_requires_lighting(requires_lighting);
        self.load_asset(&info).map(|_| ())
    }
}

fn route_instance(
    creation: &RenderAssetInstanceCreationInfo,
    active: &ActiveSceneIds,
) -> Result<usize, InstantiateError> {
    let both = creation.is_semantic() && creation.is_rgbd();
    if !creation.is_static() {
        if !both {
            return Err(InstantiateError::UnsupportedFlags(
                "dynamic instances must be both semantic and color/depth",
            ));
        }
        return Ok(active.rgbd);
    }
    if both {
        if active.has_separate_semantic() {
            return Err(InstantiateError::UnsupportedFlags(
                "static semantic and color/depth instances need a shared scene graph",
            ));
        }
        return Ok(active.rgbd);
    }
    if !active.has_separate_semantic() {
        return Err(InstantiateError::UnsupportedFlags(
            "semantic only or color/depth only instances need a separate semantic scene graph",
        ));
    }
    Ok(if creation.is_semantic() {
        active.semantic
    } else {
        active.rgbd
    })
}
