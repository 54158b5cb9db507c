use std::collections::HashMap;

use asset_common::AssetType;
use asset_importer::{GltfImporter, Importer};

/// Importers by asset type. General and unknown assets share one importer.
pub struct ImporterRegistry {
    importers: HashMap<AssetType, Box<dyn Importer>>,
}

impl ImporterRegistry {
    pub fn empty() -> Self {
        Self {
            importers: HashMap::new(),
        }
    }

    /// glTF for every file backed asset type.
    pub fn with_gltf() -> Self {
        let mut registry = Self::empty();
        registry.register(AssetType::GeneralMesh, Box::new(GltfImporter::new()));
        registry.register(AssetType::InstanceMesh, Box::new(GltfImporter::new()));
        registry.register(AssetType::AtlasMesh, Box::new(GltfImporter::new()));
        registry
    }

    /// Replaces the importer used for `asset_type`.
    pub fn register(&mut self, asset_type: AssetType, importer: Box<dyn Importer>) {
        self.importers.insert(Self::slot(asset_type), importer);
    }

    pub fn get_mut(&mut self, asset_type: AssetType) -> Option<&mut (dyn Importer + 'static)> {
        self.importers
            .get_mut(&Self::slot(asset_type))
            .map(|importer| importer.as_mut())
    }

    fn slot(asset_type: AssetType) -> AssetType {
        if asset_type.is_general() {
            AssetType::GeneralMesh
        } else {
            asset_type
        }
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::with_gltf()
    }
}
