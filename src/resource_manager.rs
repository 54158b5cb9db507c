//! Load-once cache of render assets and the registries their resources live in.

use std::{collections::HashMap, path::Path};

use asset_common::{
    ids::{IdGenerator, IdRange, MaterialId, MeshId, PrimitiveMeshId, TextureId},
    scene::{CollisionMeshData, MeshData, MeshPrimitive},
    AssetInfo, AssetKey, AssetType,
};
use asset_importer::{
    instance_mesh::split_by_object_id,
    primitive::{trajectory_tube, PrimitiveAttributes},
    Importer,
};
use serde::{Deserialize, Serialize};
use ultraviolet::{Vec3, Vec4};

use crate::{
    gpu::{GpuBackend, GpuTexture, HeadlessGpu},
    hierarchy::{build_hierarchy, MeshTransformNode, TransformHierarchy},
    importers::ImporterRegistry,
    material::{build_material, Material, MaterialBuildOptions, MaterialKey, ShadingKind},
    mesh::{AtlasMesh, GeneralMesh, InstanceMesh, MeshAttributeFlags, MeshResource},
    registry::Registry,
    scene_graph::{Drawable, DrawableGroupId, DrawableMesh, LightSetupKey, NodeId, SceneGraph},
    LoadError,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceManagerConfig {
    /// Load textures and materials. Without them every drawable uses the default material.
    pub requires_textures: bool,
    /// Turn lit metallic-roughness materials into Phong materials.
    pub build_phong_from_pbr: bool,
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            requires_textures: true,
            build_phong_from_pbr: false,
        }
    }
}

/// Everything a cached asset knows about the resources it introduced.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedAssetData {
    pub info: AssetInfo,
    pub mesh_ids: Option<IdRange<MeshId>>,
    pub material_ids: Option<IdRange<MaterialId>>,
    pub texture_ids: Option<IdRange<TextureId>>,
    pub hierarchy: TransformHierarchy,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    Loaded,
    Cached,
    /// The key was cached with a different descriptor. The cached data was kept.
    CachedConflict,
}

/// Owns GPU resources by global ID and hands out the ID ranges.
pub(crate) struct ResourceStore {
    gpu: Box<dyn GpuBackend>,
    mesh_ids: IdGenerator<MeshId>,
    material_ids: IdGenerator<MaterialId>,
    texture_ids: IdGenerator<TextureId>,
    primitive_mesh_ids: IdGenerator<PrimitiveMeshId>,
    pub(crate) meshes: Registry<MeshId, MeshResource>,
    pub(crate) materials: HashMap<MaterialKey, Material>,
    pub(crate) textures: Registry<TextureId, GpuTexture>,
    pub(crate) primitive_meshes: Registry<PrimitiveMeshId, GeneralMesh>,
}

impl ResourceStore {
    fn new(gpu: Box<dyn GpuBackend>) -> Self {
        let mut materials = HashMap::new();
        materials.insert(MaterialKey::Default, Material::default_phong());
        materials.insert(MaterialKey::White, Material::white());
        materials.insert(MaterialKey::PerVertexObjectId, Material::per_vertex_object_id());
        Self {
            gpu,
            mesh_ids: IdGenerator::new(),
            material_ids: IdGenerator::new(),
            texture_ids: IdGenerator::new(),
            primitive_mesh_ids: IdGenerator::new(),
            meshes: Registry::new(),
            materials,
            textures: Registry::new(),
            primitive_meshes: Registry::new(),
        }
    }

    fn load_textures(&mut self, importer: &dyn Importer) -> Option<IdRange<TextureId>> {
        let range = self.texture_ids.next_range(importer.texture_count())?;
        for (local, id) in range.iter().enumerate() {
            let Some(texture) = importer.texture(local) else {
                log::error!("Cannot load texture {}, skipping", local);
                continue;
            };
            match self.gpu.upload_texture(&texture) {
                Some(uploaded) => {
                    self.textures.insert(id, uploaded);
                }
                None => log::error!("Cannot upload texture {}, skipping", local),
            }
        }
        Some(range)
    }

    fn load_materials(
        &mut self,
        importer: &dyn Importer,
        textures: Option<IdRange<TextureId>>,
        options: MaterialBuildOptions,
    ) -> Option<IdRange<MaterialId>> {
        let range = self.material_ids.next_range(importer.material_count())?;
        for (local, id) in range.iter().enumerate() {
            let Some(raw) = importer.material(local) else {
                log::error!("Cannot load material {}, skipping", local);
                continue;
            };
            match build_material(&raw, textures, options) {
                Some(material) => {
                    self.materials.insert(MaterialKey::Id(id), material);
                }
                None => log::error!(
                    "Material {} has no usable attributes for this asset, skipping",
                    local
                ),
            }
        }
        Some(range)
    }

    fn load_meshes(&mut self, importer: &dyn Importer) -> Option<IdRange<MeshId>> {
        let range = self.mesh_ids.next_range(importer.mesh_count())?;
        for (local, id) in range.iter().enumerate() {
            let Some(data) = importer.mesh(local) else {
                log::error!("Cannot load mesh {}, skipping", local);
                continue;
            };
            let mesh = GeneralMesh::upload(data, self.gpu.as_mut());
            self.meshes.insert(id, MeshResource::General(mesh));
        }
        Some(range)
    }

    fn load_general(
        &mut self,
        importer: &dyn Importer,
        path: &Path,
        info: &AssetInfo,
        config: &ResourceManagerConfig,
    ) -> Result<LoadedAssetData, LoadError> {
        let roots = match importer.default_scene() {
            Some(scene) => {
                importer
                    .scene(scene)
                    .ok_or_else(|| LoadError::MissingScene {
                        path: path.to_path_buf(),
                        scene,
                    })?
                    .children
            }
            None if importer.mesh_count() > 0 => vec![0],
            None => return Err(LoadError::NoSceneOrMeshes(path.to_path_buf())),
        };

        let (texture_ids, material_ids) = if config.requires_textures {
            let texture_ids = self.load_textures(importer);
            let options = MaterialBuildOptions {
                requires_lighting: info.requires_lighting,
                build_phong_from_pbr: config.build_phong_from_pbr,
            };
            let material_ids = self.load_materials(importer, texture_ids, options);
            (texture_ids, material_ids)
        } else {
            (None, None)
        };
        let mesh_ids = self.load_meshes(importer);

        let mut hierarchy = build_hierarchy(importer, path, &roots, config.requires_textures)?;
        hierarchy.prepend_to_root(info.frame.rotation_frame_to_world());

        Ok(LoadedAssetData {
            info: info.clone(),
            mesh_ids,
            material_ids,
            texture_ids,
            hierarchy,
        })
    }

    fn load_instance(
        &mut self,
        importer: &dyn Importer,
        path: &Path,
        info: &AssetInfo,
    ) -> Result<LoadedAssetData, LoadError> {
        let mut parts = Vec::new();
        for local in 0..importer.mesh_count() {
            let Some(mesh) = importer.mesh(local) else {
                log::error!("Cannot load instance mesh {}, skipping", local);
                continue;
            };
            if info.split_instance_mesh {
                parts.extend(split_by_object_id(&mesh));
            } else {
                parts.push(mesh);
            }
        }
        let mesh_ids = self
            .mesh_ids
            .next_range(parts.len())
            .ok_or_else(|| LoadError::NoMeshes(path.to_path_buf()))?;

        let mut hierarchy = TransformHierarchy::new(MeshTransformNode::default());
        for ((local, part), id) in parts.into_iter().enumerate().zip(mesh_ids.iter()) {
            let mesh = InstanceMesh::upload(part, self.gpu.as_mut());
            self.meshes.insert(id, MeshResource::Instance(mesh));
            hierarchy.add_child(
                TransformHierarchy::ROOT,
                MeshTransformNode::default().with_mesh(local, None),
            );
        }
        hierarchy.prepend_to_root(info.frame.rotation_frame_to_world());

        Ok(LoadedAssetData {
            info: info.clone(),
            mesh_ids: Some(mesh_ids),
            material_ids: None,
            texture_ids: None,
            hierarchy,
        })
    }

    fn load_atlas(
        &mut self,
        importer: &dyn Importer,
        path: &Path,
        info: &AssetInfo,
    ) -> Result<LoadedAssetData, LoadError> {
        let parts: Vec<MeshData> = (0..importer.mesh_count())
            .filter_map(|local| {
                let mesh = importer.mesh(local);
                if mesh.is_none() {
                    log::error!("Cannot load atlas sub-mesh {}, skipping", local);
                }
                mesh
            })
            .collect();
        if parts.is_empty() {
            return Err(LoadError::NoMeshes(path.to_path_buf()));
        }

        let texture_ids = self.load_textures(importer);
        let mesh_ids = self
            .mesh_ids
            .next_range(1)
            .ok_or_else(|| LoadError::NoMeshes(path.to_path_buf()))?;
        let atlas = AtlasMesh::upload(parts, self.gpu.as_mut());
        self.meshes.insert(mesh_ids.first, MeshResource::Atlas(atlas));

        let mut hierarchy =
            TransformHierarchy::new(MeshTransformNode::default().with_mesh(0, None));
        hierarchy.prepend_to_root(info.frame.rotation_frame_to_world());

        Ok(LoadedAssetData {
            info: info.clone(),
            mesh_ids: Some(mesh_ids),
            material_ids: None,
            texture_ids,
            hierarchy,
        })
    }

    /// One mesh with one material, as used by primitives and trajectories.
    fn add_generated(&mut self, mesh: MeshData, material: Material) -> LoadedAssetData {
        let mesh_id = self.mesh_ids.next();
        let material_id = self.material_ids.next();
        let uploaded = GeneralMesh::upload(mesh, self.gpu.as_mut());
        self.meshes.insert(mesh_id, MeshResource::General(uploaded));
        self.materials.insert(MaterialKey::Id(material_id), material);

        let info = AssetInfo::primitive();
        let mut root = MeshTransformNode::default().with_mesh(0, Some(0));
        root.component_id = Some(0);
        let mut hierarchy = TransformHierarchy::new(root);
        hierarchy.prepend_to_root(info.frame.rotation_frame_to_world());

        LoadedAssetData {
            info,
            mesh_ids: Some(IdRange::new(mesh_id, mesh_id)),
            material_ids: Some(IdRange::new(material_id, material_id)),
            texture_ids: None,
            hierarchy,
        }
    }

    fn add_primitive_mesh(&mut self, mesh: MeshData) -> PrimitiveMeshId {
        let id = self.primitive_mesh_ids.next();
        let uploaded = GeneralMesh::upload(mesh, self.gpu.as_mut());
        self.primitive_meshes.insert(id, uploaded);
        id
    }
}

pub struct ResourceManager {
    config: ResourceManagerConfig,
    importers: ImporterRegistry,
    pub(crate) store: ResourceStore,
    pub(crate) resource_dict: HashMap<AssetKey, LoadedAssetData>,
    pub(crate) collision_groups: HashMap<AssetKey, Vec<CollisionMeshData>>,
    primitive_templates: HashMap<String, PrimitiveAttributes>,
    default_primitive_meshes: Vec<PrimitiveMeshId>,
}

impl ResourceManager {
    pub fn new(
        config: ResourceManagerConfig,
        importers: ImporterRegistry,
        gpu: Box<dyn GpuBackend>,
    ) -> Self {
        let primitive_templates = PrimitiveAttributes::defaults()
            .into_iter()
            .map(|attributes| (attributes.handle(), attributes))
            .collect();
        Self {
            config,
            importers,
            store: ResourceStore::new(gpu),
            resource_dict: HashMap::new(),
            collision_groups: HashMap::new(),
            primitive_templates,
            default_primitive_meshes: Vec::new(),
        }
    }

    /// glTF importers and a headless GPU backend.
    pub fn headless(config: ResourceManagerConfig) -> Self {
        Self::new(
            config,
            ImporterRegistry::with_gltf(),
            Box::new(HeadlessGpu::new()),
        )
    }

    pub fn config(&self) -> &ResourceManagerConfig {
        &self.config
    }

    pub fn importers_mut(&mut self) -> &mut ImporterRegistry {
        &mut self.importers
    }

    /// Loads the asset described by `info` unless its key is already cached.
    pub fn load_asset(&mut self, info: &AssetInfo) -> Result<LoadOutcome, LoadError> {
        if info.asset_type == AssetType::Primitive {
            return Err(LoadError::UnsupportedAssetType(info.asset_type));
        }
        let key = info.key();
        if let Some(cached) = self.resource_dict.get(&key) {
            if !cached.info.loads_like(info) {
                log::warn!(
                    "Asset {} was already loaded with a different descriptor, keeping the first load",
                    key
                );
                return Ok(LoadOutcome::CachedConflict);
            }
            return Ok(LoadOutcome::Cached);
        }

        let data = self.import(info).map_err(|error| {
            log::error!("Failed to load {}: {}", info.filepath, error);
            error
        })?;
        log::info!(
            "Loaded {} with meshes {:?}, materials {:?}, textures {:?}",
            key,
            data.mesh_ids,
            data.material_ids,
            data.texture_ids
        );
        self.resource_dict.insert(key, data);
        Ok(LoadOutcome::Loaded)
    }

    fn import(&mut self, info: &AssetInfo) -> Result<LoadedAssetData, LoadError> {
        let path = Path::new(&info.filepath);
        let importer = self
            .importers
            .get_mut(info.asset_type)
            .ok_or(LoadError::NoImporter(info.asset_type))?;
        importer
            .open_file(path)
            .map_err(|source| LoadError::Import {
                path: path.to_path_buf(),
                source,
            })?;

        let result = match info.asset_type {
            AssetType::Unknown | AssetType::GeneralMesh => {
                self.store
                    .load_general(&*importer, path, info, &self.config)
            }
            AssetType::InstanceMesh => self.store.load_instance(&*importer, path, info),
            AssetType::AtlasMesh => self.store.load_atlas(&*importer, path, info),
            AssetType::Primitive => Err(LoadError::UnsupportedAssetType(info.asset_type)),
        };
        importer.close();
        result
    }

    pub fn is_loaded(&self, key: &AssetKey) -> bool {
        self.resource_dict.contains_key(key)
    }

    pub fn asset(&self, key: &AssetKey) -> Option<&LoadedAssetData> {
        self.resource_dict.get(key)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshResource> {
        self.store.meshes.get(id)
    }

    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.store.materials.get(&key)
    }

    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.store.textures.get(id)
    }

    pub fn mesh_count(&self) -> usize {
        self.store.mesh_ids.count() as usize
    }

    pub fn material_count(&self) -> usize {
        self.store.material_ids.count() as usize
    }

    pub fn texture_count(&self) -> usize {
        self.store.texture_ids.count() as usize
    }

    /// An asset that does not need lighting can only be drawn without lights. Other
    /// combinations are allowed but warned about.
    pub fn is_light_setup_compatible(
        &self,
        data: &LoadedAssetData,
        light_setup: &LightSetupKey,
    ) -> bool {
        let compatible = *light_setup == LightSetupKey::NoLights || data.info.requires_lighting;
        if !compatible {
            log::warn!(
                "Instancing {} with light setup {:?} although it does not require lighting",
                data.info.filepath,
                light_setup
            );
        }
        compatible
    }

    pub fn primitive_template(&self, handle: &str) -> Option<&PrimitiveAttributes> {
        self.primitive_templates.get(handle)
    }

    /// Adds a primitive template to the library and returns its handle.
    pub fn register_primitive_template(
        &mut self,
        attributes: PrimitiveAttributes,
    ) -> Result<String, LoadError> {
        let handle = attributes.handle();
        if !attributes.is_valid() {
            return Err(LoadError::Primitive {
                source: asset_importer::ImportError::InvalidTemplate(handle.clone()),
                handle,
            });
        }
        self.primitive_templates.insert(handle.clone(), attributes);
        Ok(handle)
    }

    /// Builds and caches the asset of a primitive template. The handle is the cache key.
    pub fn build_primitive_asset(
        &mut self,
        attributes: &PrimitiveAttributes,
    ) -> Result<LoadOutcome, LoadError> {
        let handle = attributes.handle();
        let key = AssetKey::synthetic(&handle);
        if self.resource_dict.contains_key(&key) {
            log::info!("Primitive asset {} exists already", handle);
            return Ok(LoadOutcome::Cached);
        }
        let mesh = attributes
            .build_mesh()
            .map_err(|source| LoadError::Primitive {
                handle: handle.clone(),
                source,
            })?;

        let data = self.store.add_generated(mesh, Material::default_phong());
        self.resource_dict.insert(key, data);
        self.primitive_templates
            .entry(handle.clone())
            .or_insert_with(|| attributes.clone());
        log::info!("Primitive asset {} added", handle);
        Ok(LoadOutcome::Loaded)
    }

    pub fn build_primitive_asset_from_handle(
        &mut self,
        handle: &str,
    ) -> Result<LoadOutcome, LoadError> {
        let attributes = self
            .primitive_templates
            .get(handle)
            .cloned()
            .ok_or_else(|| LoadError::UnknownPrimitive(handle.to_owned()))?;
        self.build_primitive_asset(&attributes)
    }

    /// Caches a tube along `points` under `name`. Fewer than three segments are raised to
    /// three, non-positive radii become one millimeter.
    pub fn build_trajectory_visualization(
        &mut self,
        name: &str,
        points: &[Vec3],
        segments: u32,
        radius: f32,
        color: Vec4,
    ) -> Result<LoadOutcome, LoadError> {
        let key = AssetKey::synthetic(name);
        if self.resource_dict.contains_key(&key) {
            log::warn!("Trajectory {} exists already, keeping it", name);
            return Ok(LoadOutcome::Cached);
        }
        let segments = segments.max(3);
        let radius = if radius <= 0.0 { 0.001 } else { radius };
        log::info!(
            "Building trajectory {} from {} points, radius {} and {} segments",
            name,
            points.len(),
            radius,
            segments
        );

        let mesh = trajectory_tube(points, segments, radius).ok_or(LoadError::TooFewPoints)?;
        let data = self.store.add_generated(mesh, Material::colored(color));
        self.resource_dict.insert(key, data);
        Ok(LoadOutcome::Loaded)
    }

    pub fn add_primitive_mesh(&mut self, mesh: MeshData) -> PrimitiveMeshId {
        self.store.add_primitive_mesh(mesh)
    }

    /// Frees a primitive mesh. Its ID is never handed out again.
    pub fn remove_primitive_mesh(&mut self, id: PrimitiveMeshId) -> bool {
        let removed = self.store.primitive_meshes.remove(id).is_some();
        if !removed {
            log::warn!("Primitive mesh {} does not exist", id);
        }
        removed
    }

    pub fn primitive_mesh(&self, id: PrimitiveMeshId) -> Option<&GeneralMesh> {
        self.store.primitive_meshes.get(id)
    }

    /// Draws a primitive mesh at `node`, unlit and white.
    pub fn add_primitive_to_drawables(
        &self,
        id: PrimitiveMeshId,
        node: NodeId,
        graph: &mut dyn SceneGraph,
        group: DrawableGroupId,
    ) -> bool {
        if !self.store.primitive_meshes.contains(id) {
            log::error!("Primitive mesh {} does not exist", id);
            return false;
        }
        graph.add_drawable(
            node,
            Drawable {
                mesh: DrawableMesh::Primitive(id),
                material: MaterialKey::White,
                light_setup: LightSetupKey::NoLights,
                shading: ShadingKind::Phong,
                attributes: MeshAttributeFlags::empty(),
            },
            group,
        );
        true
    }

    /// Wireframe cube and icosphere for bounding box and marker drawing.
    pub fn init_default_primitive_meshes(&mut self) -> Result<&[PrimitiveMeshId], LoadError> {
        if self.default_primitive_meshes.is_empty() {
            for attributes in [
                PrimitiveAttributes::cube(true),
                PrimitiveAttributes::icosphere(true, 1),
            ] {
                let mesh = attributes
                    .build_mesh()
                    .map_err(|source| LoadError::Primitive {
                        handle: attributes.handle(),
                        source,
                    })?;
                let id = self.add_primitive_mesh(mesh);
                self.default_primitive_meshes.push(id);
            }
        }
        Ok(self.default_primitive_meshes.as_slice())
    }

    /// Turns a navigation triangle mesh into a wireframe primitive mesh, drawn below `parent`
    /// when one is given. Returns `None` for meshes without triangles.
    pub fn load_nav_mesh_visualization(
        &mut self,
        nav_mesh: &CollisionMeshData,
        parent: Option<(NodeId, &mut dyn SceneGraph, DrawableGroupId)>,
    ) -> Option<PrimitiveMeshId> {
        if nav_mesh.indices.len() < 3 {
            return None;
        }
        let indices = nav_mesh
            .indices
            .chunks_exact(3)
            .flat_map(|t| [t[0], t[1], t[1], t[2], t[2], t[0]])
            .collect();
        let lines = MeshData::new(MeshPrimitive::Lines, nav_mesh.positions.clone(), indices);
        let id = self.add_primitive_mesh(lines);

        if let Some((node, graph, group)) = parent {
            self.add_primitive_to_drawables(id, node, graph, group);
        }
        Some(id)
    }
}
