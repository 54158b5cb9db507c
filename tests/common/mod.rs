#![allow(dead_code)]

use std::{
    cell::Cell,
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use asset_common::scene::{
    MeshData, MeshPrimitive, ObjectData, PhongAttributes, RawMaterial, RawTexture, SceneData,
};
use asset_importer::{ImportError, Importer};
use scene_assets::{
    gpu::HeadlessGpu, importers::ImporterRegistry, resource_manager::ResourceManagerConfig,
    ResourceManager,
};
use ultraviolet::{Mat4, Vec3};

/// Contents the scripted importer reports for one path.
#[derive(Clone, Debug, Default)]
pub struct ScriptedAsset {
    pub meshes: Vec<MeshData>,
    pub materials: Vec<RawMaterial>,
    pub textures: Vec<RawTexture>,
    pub objects: Vec<ObjectData>,
    pub default_scene: Option<usize>,
    pub scenes: Vec<SceneData>,
    /// Mesh indices that are counted but cannot be read.
    pub unreadable_meshes: Vec<usize>,
}

impl ScriptedAsset {
    /// Root object with mesh 0 and material 0, its child with mesh 1 and no material.
    pub fn two_nodes() -> Self {
        Self {
            meshes: vec![triangle(0.0), triangle(3.0)],
            materials: vec![phong_material()],
            textures: Vec::new(),
            objects: vec![
                ObjectData::mesh(0, Some(0), Mat4::identity()).with_children(vec![1]),
                ObjectData::mesh(1, None, Mat4::from_translation(Vec3::unit_y())),
            ],
            default_scene: Some(0),
            scenes: vec![SceneData { children: vec![0] }],
            unreadable_meshes: Vec::new(),
        }
    }

    /// One object drawing `mesh`, without a scene.
    pub fn single_object(mesh: MeshData) -> Self {
        Self {
            meshes: vec![mesh],
            objects: vec![ObjectData::mesh(0, None, Mat4::identity())],
            ..Self::default()
        }
    }

    /// A single mesh and no scene at all.
    pub fn single_mesh(mesh: MeshData) -> Self {
        Self {
            meshes: vec![mesh],
            ..Self::default()
        }
    }
}

/// Importer that serves [`ScriptedAsset`]s by path and counts every opened file.
#[derive(Clone, Default)]
pub struct ScriptedImporter {
    assets: HashMap<PathBuf, ScriptedAsset>,
    current: Option<ScriptedAsset>,
    pub opened: Rc<Cell<usize>>,
}

impl ScriptedImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, path: impl Into<PathBuf>, asset: ScriptedAsset) -> Self {
        self.assets.insert(path.into(), asset);
        self
    }

    fn current(&self) -> Option<&ScriptedAsset> {
        self.current.as_ref()
    }
}

impl Importer for ScriptedImporter {
    fn open_file(&mut self, path: &Path) -> Result<(), ImportError> {
        let asset = self
            .assets
            .get(path)
            .cloned()
            .ok_or_else(|| ImportError::NotFound(path.to_path_buf()))?;
        self.opened.set(self.opened.get() + 1);
        self.current = Some(asset);
        Ok(())
    }

    fn close(&mut self) {
        self.current = None;
    }

    fn mesh_count(&self) -> usize {
        self.current().map_or(0, |asset| asset.meshes.len())
    }

    fn material_count(&self) -> usize {
        self.current().map_or(0, |asset| asset.materials.len())
    }

    fn texture_count(&self) -> usize {
        self.current().map_or(0, |asset| asset.textures.len())
    }

    fn object_count(&self) -> usize {
        self.current().map_or(0, |asset| asset.objects.len())
    }

    fn mesh(&self, index: usize) -> Option<MeshData> {
        let asset = self.current()?;
        if asset.unreadable_meshes.contains(&index) {
            return None;
        }
        asset.meshes.get(index).cloned()
    }

    fn material(&self, index: usize) -> Option<RawMaterial> {
        self.current()?.materials.get(index).cloned()
    }

    fn texture(&self, index: usize) -> Option<RawTexture> {
        self.current()?.textures.get(index).cloned()
    }

    fn object3d(&self, index: usize) -> Option<ObjectData> {
        self.current()?.objects.get(index).cloned()
    }

    fn default_scene(&self) -> Option<usize> {
        self.current()?.default_scene
    }

    fn scene(&self, index: usize) -> Option<SceneData> {
        self.current()?.scenes.get(index).cloned()
    }
}

pub fn triangle(offset: f32) -> MeshData {
    MeshData::new(
        MeshPrimitive::Triangles,
        vec![
            Vec3::new(offset, 0.0, 0.0),
            Vec3::new(offset + 1.0, 0.0, 0.0),
            Vec3::new(offset, 1.0, 0.0),
        ],
        vec![0, 1, 2],
    )
}

pub fn phong_material() -> RawMaterial {
    RawMaterial {
        name: Some("phong".to_owned()),
        phong: Some(PhongAttributes::default()),
        pbr: None,
        double_sided: false,
    }
}

/// Manager whose every file backed asset type is served by `importer`.
pub fn manager_with(importer: ScriptedImporter) -> ResourceManager {
    let mut importers = ImporterRegistry::empty();
    for asset_type in [
        asset_common::AssetType::GeneralMesh,
        asset_common::AssetType::InstanceMesh,
        asset_common::AssetType::AtlasMesh,
    ] {
        importers.register(asset_type, Box::new(importer.clone()));
    }
    ResourceManager::new(
        ResourceManagerConfig::default(),
        importers,
        Box::new(HeadlessGpu::new()),
    )
}
