//! Collision geometry derived from cached assets.

use asset_common::{scene::CollisionMeshData, AssetKey, AssetType};
use ultraviolet::Mat4;

use crate::{mesh::CollisionMeshSource, CollisionError, LoadedAssetData, ResourceManager};

impl ResourceManager {
    /// Collision meshes of every mesh node of `key`, depth first and in the asset's local
    /// frame. Built on first request and cached afterwards.
    pub fn get_or_build_collision_group(
        &mut self,
        key: &AssetKey,
    ) -> Result<&[CollisionMeshData], CollisionError> {
        if !self.collision_groups.contains_key(key) {
            let data = self
                .resource_dict
                .get(key)
                .ok_or_else(|| CollisionError::NotLoaded(key.clone()))?;
            let group = self.collision_meshes(key, data, false)?;
            log::debug!("Built collision group of {} with {} meshes", key, group.len());
            self.collision_groups.insert(key.clone(), group);
        }
        Ok(self
            .collision_groups
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub fn collision_group(&self, key: &AssetKey) -> Option<&[CollisionMeshData]> {
        self.collision_groups.get(key).map(Vec::as_slice)
    }

    /// All collision meshes of `key` in world space, concatenated into one mesh.
    pub fn create_joined_collision_mesh(
        &self,
        key: &AssetKey,
    ) -> Result<CollisionMeshData, CollisionError> {
        let data = self
            .resource_dict
            .get(key)
            .ok_or_else(|| CollisionError::NotLoaded(key.clone()))?;

        let mut joined = CollisionMeshData::default();
        for mesh in self.collision_meshes(key, data, true)? {
            let base = joined.positions.len() as u32;
            joined.positions.extend(mesh.positions);
            joined
                .indices
                .extend(mesh.indices.into_iter().map(|index| index + base));
        }
        Ok(joined)
    }

    /// Walks the hierarchy and collects the mesh of every node that has one. With
    /// `to_world` the cumulative transform is applied to each mesh's positions.
    fn collision_meshes(
        &self,
        key: &AssetKey,
        data: &LoadedAssetData,
        to_world: bool,
    ) -> Result<Vec<CollisionMeshData>, CollisionError> {
        if data.info.asset_type == AssetType::Primitive {
            return Err(CollisionError::UnsupportedMeshType {
                key: key.clone(),
                asset_type: data.info.asset_type,
            });
        }

        let mut meshes = Vec::new();
        data.hierarchy.visit(Mat4::identity(), |node, world| {
            let Some(local) = node.local_mesh_id else {
                return;
            };
            let Some(mesh_id) = data.mesh_ids.and_then(|range| range.global(local)) else {
                log::warn!("Mesh {} of {} is outside its mesh range", local, key);
                return;
            };
            let Some(mesh) = self.store.meshes.get(mesh_id) else {
                log::warn!("Mesh {:?} of {} was never loaded, skipping it", mesh_id, key);
                return;
            };
            let mut collision = mesh.collision_mesh_data();
            if to_world {
                for position in &mut collision.positions {
                    *position = world.transform_point3(*position);
                }
            }
            meshes.push(collision);
        });
        Ok(meshes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_manager::ResourceManagerConfig;
    use asset_importer::primitive::PrimitiveAttributes;

    #[test]
    fn primitive_assets_have_no_collision_group() {
        let mut manager = ResourceManager::headless(ResourceManagerConfig::default());
        let cube = PrimitiveAttributes::cube(false);
        manager.build_primitive_asset(&cube).unwrap();
        let key = AssetKey::synthetic(cube.handle());

        assert!(matches!(
            manager.get_or_build_collision_group(&key),
            Err(CollisionError::UnsupportedMeshType { .. })
        ));
        assert!(manager.collision_group(&key).is_none());
    }

    #[test]
    fn unloaded_assets_are_reported() {
        let mut manager = ResourceManager::headless(ResourceManagerConfig::default());
        let key = AssetKey::synthetic("nothing");
        assert!(matches!(
            manager.get_or_build_collision_group(&key),
            Err(CollisionError::NotLoaded(_))
        ));
        assert!(matches!(
            manager.create_joined_collision_mesh(&key),
            Err(CollisionError::NotLoaded(_))
        ));
    }
}
