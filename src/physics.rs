use asset_common::{scene::CollisionMeshData, AssetKey};

/// Receives the collision geometry of loaded stages.
pub trait PhysicsBackend {
    /// Returns `false` if the stage was rejected.
    fn add_stage(&mut self, handle: &AssetKey, meshes: &[CollisionMeshData]) -> bool;
}

/// Accepts every stage and remembers nothing but counts.
#[derive(Debug, Default)]
pub struct NullPhysics {
    pub stages: usize,
    pub triangles: usize,
}

impl PhysicsBackend for NullPhysics {
    fn add_stage(&mut self, handle: &AssetKey, meshes: &[CollisionMeshData]) -> bool {
        let triangles: usize = meshes.iter().map(|mesh| mesh.indices.len() / 3).sum();
        log::debug!("Stage {} added with {} triangles", handle, triangles);
        self.stages += 1;
        self.triangles += triangles;
        true
    }
}
