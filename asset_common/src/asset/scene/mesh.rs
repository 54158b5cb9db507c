use serde::{Deserialize, Serialize};
use ultraviolet::{Vec2, Vec3, Vec4};

use crate::{bounds::Aabb, gpu::Vertex};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshPrimitive {
    #[default]
    Triangles,
    Lines,
}

/// Raw mesh as produced by an importer. Optional attributes have one entry per position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub primitive: MeshPrimitive,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub tex_coords: Option<Vec<Vec2>>,
    /// `w` holds the bitangent sign.
    pub tangents: Option<Vec<Vec4>>,
    pub bitangents: Option<Vec<Vec3>>,
    pub colors: Option<Vec<Vec4>>,
    pub object_ids: Option<Vec<u32>>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(primitive: MeshPrimitive, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            primitive,
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Interleaves all attributes into the GPU vertex layout.
    pub fn vertices(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| {
                let mut vertex = Vertex {
                    position: self.positions[i].into(),
                    ..Default::default()
                };
                if let Some(normal) = self.normals.as_ref().and_then(|n| n.get(i)) {
                    vertex.normal = (*normal).into();
                }
                if let Some(uv) = self.tex_coords.as_ref().and_then(|t| t.get(i)) {
                    vertex.uv = (*uv).into();
                }
                if let Some(tangent) = self.tangents.as_ref().and_then(|t| t.get(i)) {
                    vertex.tangent = (*tangent).into();
                }
                if let Some(color) = self.colors.as_ref().and_then(|c| c.get(i)) {
                    vertex.color = (*color).into();
                }
                if let Some(id) = self.object_ids.as_ref().and_then(|ids| ids.get(i)) {
                    vertex.object_id = *id;
                }
                vertex
            })
            .collect()
    }

    pub fn collision_data(&self) -> CollisionMeshData {
        CollisionMeshData {
            positions: self.positions.clone(),
            indices: self.indices.clone(),
        }
    }

    /// Unit cube centered at the origin, four vertices per face.
    pub fn new_unit_cube() -> MeshData {
        struct CubeFace {
            corners: [usize; 4],
            normal: Vec3,
        }

        let corners: [Vec3; 8] = [
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        ];

        let faces = [
            CubeFace {
                corners: [0, 1, 2, 3],
                normal: Vec3::unit_z(),
            },
            CubeFace {
                corners: [5, 4, 7, 6],
                normal: -Vec3::unit_z(),
            },
            CubeFace {
                corners: [1, 5, 6, 2],
                normal: Vec3::unit_x(),
            },
            CubeFace {
                corners: [4, 0, 3, 7],
                normal: -Vec3::unit_x(),
            },
            CubeFace {
                corners: [3, 2, 6, 7],
                normal: Vec3::unit_y(),
            },
            CubeFace {
                corners: [1, 0, 4, 5],
                normal: -Vec3::unit_y(),
            },
        ];

        let face_uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        let mut mesh = MeshData::new(MeshPrimitive::Triangles, Vec::new(), Vec::new());
        let mut normals = Vec::with_capacity(24);
        let mut tex_coords = Vec::with_capacity(24);
        for (face_index, face) in faces.iter().enumerate() {
            for (corner, uv) in face.corners.iter().zip(face_uvs) {
                mesh.positions.push(corners[*corner]);
                normals.push(face.normal);
                tex_coords.push(uv);
            }
            let offset = 4 * face_index as u32;
            mesh.indices
                .extend([0, 1, 2, 2, 3, 0].map(|i| offset + i));
        }
        mesh.normals = Some(normals);
        mesh.tex_coords = Some(tex_coords);
        mesh
    }
}

/// Positions and indices only, in whatever space the producer chose.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionMeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}
