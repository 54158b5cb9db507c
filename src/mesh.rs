use asset_common::{
    bounds::Aabb,
    scene::{CollisionMeshData, MeshData},
};
use bitflags::bitflags;

use crate::gpu::{GpuBackend, GpuMesh};

bitflags! {
    /// Optional vertex attributes a drawable's shader has to expect.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MeshAttributeFlags: u8 {
        const HAS_TANGENT = 1;
        const HAS_SEPARATE_BITANGENT = 1 << 1;
    }
}

impl MeshAttributeFlags {
    /// Bitangents only count when tangents are present too.
    pub fn of(mesh: &MeshData) -> Self {
        let mut flags = Self::empty();
        if mesh.tangents.is_some() {
            flags |= Self::HAS_TANGENT;
            flags.set(Self::HAS_SEPARATE_BITANGENT, mesh.bitangents.is_some());
        }
        flags
    }
}

/// Anything that can hand its geometry to the physics side.
pub trait CollisionMeshSource {
    fn collision_mesh_data(&self) -> CollisionMeshData;
}

/// Mesh of a hierarchical scene or a generated primitive. Keeps its CPU copy for collision
/// and bounding box queries.
#[derive(Debug)]
pub struct GeneralMesh {
    pub data: MeshData,
    pub gpu: GpuMesh,
    pub bounds: Aabb,
}

impl GeneralMesh {
    pub fn upload(data: MeshData, gpu: &mut dyn GpuBackend) -> Self {
        let uploaded = gpu.upload_mesh(&data);
        Self {
            bounds: data.bounds(),
            gpu: uploaded,
            data,
        }
    }
}

/// One object of an instance mesh, drawn with the per-vertex object id material.
#[derive(Debug)]
pub struct InstanceMesh {
    pub data: MeshData,
    pub gpu: GpuMesh,
    pub bounds: Aabb,
}

impl InstanceMesh {
    pub fn upload(data: MeshData, gpu: &mut dyn GpuBackend) -> Self {
        let uploaded = gpu.upload_mesh(&data);
        Self {
            bounds: data.bounds(),
            gpu: uploaded,
            data,
        }
    }
}

#[derive(Debug)]
pub struct AtlasSubmesh {
    pub data: MeshData,
    pub gpu: GpuMesh,
}

/// Single mesh split into sub-meshes that all sample the same texture atlas.
#[derive(Debug)]
pub struct AtlasMesh {
    pub submeshes: Vec<AtlasSubmesh>,
    pub bounds: Aabb,
}

impl AtlasMesh {
    pub fn upload(parts: Vec<MeshData>, gpu: &mut dyn GpuBackend) -> Self {
        let bounds = Aabb::from_points(parts.iter().flat_map(|part| part.positions.iter()));
        let submeshes = parts
            .into_iter()
            .map(|data| AtlasSubmesh {
                gpu: gpu.upload_mesh(&data),
                data,
            })
            .collect();
        Self { submeshes, bounds }
    }
}

#[derive(Debug)]
pub enum MeshResource {
    General(GeneralMesh),
    Instance(InstanceMesh),
    Atlas(AtlasMesh),
}

impl MeshResource {
    pub fn bounds(&self) -> Aabb {
        match self {
            MeshResource::General(mesh) => mesh.bounds,
            MeshResource::Instance(mesh) => mesh.bounds,
            MeshResource::Atlas(mesh) => mesh.bounds,
        }
    }

    /// Positions in the mesh's local frame, all sub-meshes included.
    pub fn positions(&self) -> Box<dyn Iterator<Item = &ultraviolet::Vec3> + '_> {
        match self {
            MeshResource::General(mesh) => Box::new(mesh.data.positions.iter()),
            MeshResource::Instance(mesh) => Box::new(mesh.data.positions.iter()),
            MeshResource::Atlas(mesh) => Box::new(
                mesh.submeshes
                    .iter()
                    .flat_map(|submesh| submesh.data.positions.iter()),
            ),
        }
    }

    pub fn attribute_flags(&self) -> MeshAttributeFlags {
        match self {
            MeshResource::General(mesh) => MeshAttributeFlags::of(&mesh.data),
            MeshResource::Instance(mesh) => MeshAttributeFlags::of(&mesh.data),
            MeshResource::Atlas(mesh) => mesh
                .submeshes
                .iter()
                .fold(MeshAttributeFlags::all(), |flags, submesh| {
                    flags & MeshAttributeFlags::of(&submesh.data)
                }),
        }
    }
}

impl CollisionMeshSource for GeneralMesh {
    fn collision_mesh_data(&self) -> CollisionMeshData {
        self.data.collision_data()
    }
}

impl CollisionMeshSource for InstanceMesh {
    fn collision_mesh_data(&self) -> CollisionMeshData {
        self.data.collision_data()
    }
}

impl CollisionMeshSource for AtlasMesh {
    fn collision_mesh_data(&self) -> CollisionMeshData {
        let mut joined = CollisionMeshData::default();
        for submesh in &self.submeshes {
            let base = joined.positions.len() as u32;
            joined.positions.extend_from_slice(&submesh.data.positions);
            joined
                .indices
                .extend(submesh.data.indices.iter().map(|index| index + base));
        }
        joined
    }
}

impl CollisionMeshSource for MeshResource {
    fn collision_mesh_data(&self) -> CollisionMeshData {
        match self {
            MeshResource::General(mesh) => mesh.collision_mesh_data(),
            MeshResource::Instance(mesh) => mesh.collision_mesh_data(),
            MeshResource::Atlas(mesh) => mesh.collision_mesh_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;
    use asset_common::scene::MeshPrimitive;
    use ultraviolet::Vec3;

    fn triangle(offset: f32) -> MeshData {
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

    #[test]
    fn atlas_collision_data_rebases_indices() {
        let mut gpu = HeadlessGpu::new();
        let atlas = AtlasMesh::upload(vec![triangle(0.0), triangle(5.0)], &mut gpu);

        let joined = atlas.collision_mesh_data();
        assert_eq!(joined.positions.len(), 6);
        assert_eq!(joined.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(atlas.bounds.max.x, 6.0);
    }

    #[test]
    fn attribute_flags_follow_mesh_data() {
        let mut tangents = triangle(0.0);
        tangents.tangents = Some(vec![ultraviolet::Vec4::unit_x(); 3]);
        assert_eq!(
            MeshAttributeFlags::of(&tangents),
            MeshAttributeFlags::HAS_TANGENT
        );
        assert!(MeshAttributeFlags::of(&triangle(0.0)).is_empty());
    }
}
