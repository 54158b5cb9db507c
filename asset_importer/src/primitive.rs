//! Procedurally generated meshes: cubes, icospheres, cylinders and trajectory tubes.

use std::{collections::HashMap, f32::consts::TAU};

use asset_common::scene::{MeshData, MeshPrimitive};
use serde::{Deserialize, Serialize};
use ultraviolet::{Vec2, Vec3, Vec4};

use crate::ImportError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveShape {
    Cube,
    Icosphere {
        subdivisions: i32,
    },
    Cylinder {
        rings: i32,
        segments: i32,
        half_length: f64,
        cap_ends: bool,
    },
}

/// Parameters of one generated primitive. The handle is derived from them and doubles as
/// the cache key of the resulting asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveAttributes {
    pub shape: PrimitiveShape,
    pub wireframe: bool,
    /// Solid primitives only.
    #[serde(default)]
    pub use_texture_coords: bool,
    /// Solid primitives only.
    #[serde(default)]
    pub use_tangents: bool,
}

impl PrimitiveAttributes {
    pub fn cube(wireframe: bool) -> Self {
        Self::new(PrimitiveShape::Cube, wireframe)
    }

    /// Wireframe icospheres are never subdivided.
    pub fn icosphere(wireframe: bool, subdivisions: i32) -> Self {
        let subdivisions = if wireframe { 1 } else { subdivisions };
        Self::new(PrimitiveShape::Icosphere { subdivisions }, wireframe)
    }

    pub fn cylinder(wireframe: bool, rings: i32, segments: i32, half_length: f64) -> Self {
        Self::new(
            PrimitiveShape::Cylinder {
                rings,
                segments,
                half_length,
                cap_ends: !wireframe,
            },
            wireframe,
        )
    }

    fn new(shape: PrimitiveShape, wireframe: bool) -> Self {
        Self {
            shape,
            wireframe,
            use_texture_coords: false,
            use_tangents: false,
        }
    }

    pub fn with_texture_coords(mut self, use_texture_coords: bool) -> Self {
        self.use_texture_coords = use_texture_coords && !self.wireframe;
        self
    }

    pub fn with_tangents(mut self, use_tangents: bool) -> Self {
        self.use_tangents = use_tangents && !self.wireframe;
        self
    }

    pub fn class_name(&self) -> &'static str {
        match (&self.shape, self.wireframe) {
            (PrimitiveShape::Cube, false) => "cubeSolid",
            (PrimitiveShape::Cube, true) => "cubeWireframe",
            (PrimitiveShape::Icosphere { .. }, false) => "icosphereSolid",
            (PrimitiveShape::Icosphere { .. }, true) => "icosphereWireframe",
            (PrimitiveShape::Cylinder { .. }, false) => "cylinderSolid",
            (PrimitiveShape::Cylinder { .. }, true) => "cylinderWireframe",
        }
    }

    /// e.g. `cubeSolid`, `icosphereSolid_subdivs_1`,
    /// `cylinderWireframe_rings_1_segments_16_halfLen_1`.
    pub fn handle(&self) -> String {
        let mut handle = self.class_name().to_owned();
        match &self.shape {
            PrimitiveShape::Cube => {}
            PrimitiveShape::Icosphere { subdivisions } => {
                handle.push_str(&format!("_subdivs_{}", subdivisions));
            }
            PrimitiveShape::Cylinder {
                rings,
                segments,
                half_length,
                cap_ends,
            } => {
                handle.push_str(&format!(
                    "_rings_{}_segments_{}_halfLen_{}",
                    rings, segments, half_length
                ));
                if !self.wireframe {
                    handle.push_str(&format!(
                        "_useTexCoords_{}_useTangents_{}_capEnds_{}",
                        self.use_texture_coords, self.use_tangents, cap_ends
                    ));
                }
            }
        }
        handle
    }

    /// Whether the parameters describe a primitive that can be built.
    pub fn is_valid(&self) -> bool {
        match &self.shape {
            PrimitiveShape::Cube => true,
            PrimitiveShape::Icosphere { subdivisions } => self.wireframe || *subdivisions >= 0,
            PrimitiveShape::Cylinder {
                rings,
                segments,
                half_length,
                ..
            } => {
                let segments_ok = if self.wireframe {
                    *segments >= 4 && segments % 4 == 0
                } else {
                    *segments > 2
                };
                *rings > 0 && *half_length > 0.0 && segments_ok
            }
        }
    }

    pub fn build_mesh(&self) -> Result<MeshData, ImportError> {
        if !self.is_valid() {
            return Err(ImportError::InvalidTemplate(self.handle()));
        }
        let mut mesh = match (&self.shape, self.wireframe) {
            (PrimitiveShape::Cube, false) => solid_cube(),
            (PrimitiveShape::Cube, true) => wireframe_cube(),
            (PrimitiveShape::Icosphere { subdivisions }, false) => {
                solid_icosphere(*subdivisions as u32)
            }
            (PrimitiveShape::Icosphere { .. }, true) => wireframe_icosphere(),
            (
                PrimitiveShape::Cylinder {
                    rings,
                    segments,
                    half_length,
                    cap_ends,
                },
                false,
            ) => solid_cylinder(
                *rings as u32,
                *segments as u32,
                *half_length as f32,
                *cap_ends,
            ),
            (
                PrimitiveShape::Cylinder {
                    rings,
                    segments,
                    half_length,
                    ..
                },
                true,
            ) => wireframe_cylinder(*rings as u32, *segments as u32, *half_length as f32),
        };
        if !self.use_texture_coords {
            mesh.tex_coords = None;
        }
        if !self.use_tangents {
            mesh.tangents = None;
        }
        Ok(mesh)
    }

    /// Templates every resource manager knows about from the start.
    pub fn defaults() -> Vec<PrimitiveAttributes> {
        vec![
            Self::cube(false),
            Self::cube(true),
            Self::icosphere(false, 1),
            Self::icosphere(true, 1),
            Self::cylinder(false, 1, 16, 1.0),
            Self::cylinder(true, 1, 16, 1.0),
        ]
    }
}

/// Cube spanning `[-1, 1]` on every axis.
fn solid_cube() -> MeshData {
    let mut mesh = MeshData::new_unit_cube();
    for position in mesh.positions.iter_mut() {
        *position *= 2.0;
    }
    let tangents = mesh
        .positions
        .chunks_exact(4)
        .flat_map(|face| {
            let tangent = (face[1] - face[0]).normalized();
            [Vec4::new(tangent.x, tangent.y, tangent.z, 1.0); 4]
        })
        .collect();
    mesh.tangents = Some(tangents);
    mesh
}

fn wireframe_cube() -> MeshData {
    let positions = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            )
        })
        .collect();
    let mut indices = Vec::with_capacity(24);
    for corner in 0u32..8 {
        for axis in [1u32, 2, 4] {
            if corner & axis == 0 {
                indices.extend([corner, corner | axis]);
            }
        }
    }
    MeshData::new(MeshPrimitive::Lines, positions, indices)
}

fn icosahedron() -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let positions = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| Vec3::new(x, y, z).normalized())
    .collect();
    let faces = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    (positions, faces)
}

/// Unit sphere, `10 * 4^n + 2` vertices.
fn solid_icosphere(subdivisions: u32) -> MeshData {
    let (mut positions, mut faces) = icosahedron();
    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| -> u32 {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                let point = (positions[a as usize] + positions[b as usize]).normalized();
                positions.push(point);
                positions.len() as u32 - 1
            })
        };
        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            next.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }

    let tex_coords = positions
        .iter()
        .map(|p| Vec2::new(0.5 + p.z.atan2(p.x) / TAU, 0.5 - p.y.asin() / std::f32::consts::PI))
        .collect();
    MeshData {
        normals: Some(positions.clone()),
        tex_coords: Some(tex_coords),
        ..MeshData::new(
            MeshPrimitive::Triangles,
            positions,
            faces.into_iter().flatten().collect(),
        )
    }
}

fn wireframe_icosphere() -> MeshData {
    let (positions, faces) = icosahedron();
    let mut edges: Vec<(u32, u32)> = faces
        .iter()
        .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect();
    edges.sort_unstable();
    edges.dedup();
    let indices = edges.into_iter().flat_map(|(a, b)| [a, b]).collect();
    MeshData::new(MeshPrimitive::Lines, positions, indices)
}

fn ring_direction(segment: u32, segments: u32) -> Vec3 {
    let angle = TAU * segment as f32 / segments as f32;
    Vec3::new(angle.sin(), 0.0, angle.cos())
}

/// Radius one, axis along Y.
fn solid_cylinder(rings: u32, segments: u32, half_length: f32, cap_ends: bool) -> MeshData {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut tex_coords = Vec::new();
    let mut tangents = Vec::new();
    let mut indices = Vec::new();

    let row = segments + 1;
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let y = -half_length + 2.0 * half_length * v;
        for segment in 0..=segments {
            let direction = ring_direction(segment % segments, segments);
            positions.push(direction + Vec3::unit_y() * y);
            normals.push(direction);
            tex_coords.push(Vec2::new(segment as f32 / segments as f32, v));
            tangents.push(Vec4::new(direction.z, 0.0, -direction.x, 1.0));
        }
    }
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * row + segment;
            let b = a + 1;
            let c = a + row;
            let d = c + 1;
            indices.extend([a, b, d, a, d, c]);
        }
    }

    if cap_ends {
        for (y, normal) in [(-half_length, -Vec3::unit_y()), (half_length, Vec3::unit_y())] {
            let center = positions.len() as u32;
            positions.push(Vec3::unit_y() * y);
            normals.push(normal);
            tex_coords.push(Vec2::broadcast(0.5));
            tangents.push(Vec4::new(1.0, 0.0, 0.0, 1.0));
            for segment in 0..segments {
                let direction = ring_direction(segment, segments);
                positions.push(direction + Vec3::unit_y() * y);
                normals.push(normal);
                tex_coords.push(Vec2::new(0.5 + direction.x * 0.5, 0.5 + direction.z * 0.5));
                tangents.push(Vec4::new(1.0, 0.0, 0.0, 1.0));
            }
            for segment in 0..segments {
                let current = center + 1 + segment;
                let next = center + 1 + (segment + 1) % segments;
                if normal.y > 0.0 {
                    indices.extend([center, current, next]);
                } else {
                    indices.extend([center, next, current]);
                }
            }
        }
    }

    MeshData {
        normals: Some(normals),
        tex_coords: Some(tex_coords),
        tangents: Some(tangents),
        ..MeshData::new(MeshPrimitive::Triangles, positions, indices)
    }
}

fn wireframe_cylinder(rings: u32, segments: u32, half_length: f32) -> MeshData {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for ring in 0..=rings {
        let y = -half_length + 2.0 * half_length * ring as f32 / rings as f32;
        let start = positions.len() as u32;
        for segment in 0..segments {
            positions.push(ring_direction(segment, segments) + Vec3::unit_y() * y);
            indices.extend([start + segment, start + (segment + 1) % segments]);
        }
    }
    let top = rings * segments;
    for segment in (0..segments).step_by((segments / 4) as usize) {
        indices.extend([segment, top + segment]);
    }
    MeshData::new(MeshPrimitive::Lines, positions, indices)
}

/// Tube of `radius` along `points`, `segments` vertices around each point.
///
/// Consecutive duplicate points are dropped. Returns `None` when fewer than two distinct
/// points remain.
pub fn trajectory_tube(points: &[Vec3], segments: u32, radius: f32) -> Option<MeshData> {
    let mut path: Vec<Vec3> = Vec::with_capacity(points.len());
    for point in points {
        if path.last().map_or(true, |last| (*last - *point).mag_sq() > 1.0e-12) {
            path.push(*point);
        }
    }
    if path.len() < 2 || segments < 3 {
        return None;
    }

    let last = path.len() - 1;
    let directions: Vec<Vec3> = (0..path.len())
        .map(|i| {
            let incoming = (i > 0).then(|| (path[i] - path[i - 1]).normalized());
            let outgoing = (i < last).then(|| (path[i + 1] - path[i]).normalized());
            match (incoming, outgoing) {
                (Some(a), Some(b)) if (a + b).mag_sq() > 1.0e-8 => (a + b).normalized(),
                (_, Some(b)) => b,
                (Some(a), None) => a,
                (None, None) => Vec3::unit_y(),
            }
        })
        .collect();

    let mut positions = Vec::with_capacity(path.len() * segments as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut normal = perpendicular(directions[0]);
    for (point, direction) in path.iter().zip(&directions) {
        // parallel transport of the previous ring's frame
        let projected = normal - *direction * normal.dot(*direction);
        normal = if projected.mag_sq() > 1.0e-8 {
            projected.normalized()
        } else {
            perpendicular(*direction)
        };
        let binormal = direction.cross(normal);
        for segment in 0..segments {
            let angle = TAU * segment as f32 / segments as f32;
            let offset = normal * angle.cos() + binormal * angle.sin();
            positions.push(*point + offset * radius);
            normals.push(offset);
        }
    }

    let mut indices = Vec::with_capacity(last * segments as usize * 6);
    for ring in 0..last as u32 {
        for segment in 0..segments {
            let a = ring * segments + segment;
            let b = ring * segments + (segment + 1) % segments;
            let c = a + segments;
            let d = b + segments;
            indices.extend([a, b, d, a, d, c]);
        }
    }

    Some(MeshData {
        normals: Some(normals),
        ..MeshData::new(MeshPrimitive::Triangles, positions, indices)
    })
}

fn perpendicular(direction: Vec3) -> Vec3 {
    let axis = if direction.x.abs() < 0.9 {
        Vec3::unit_x()
    } else {
        Vec3::unit_y()
    };
    direction.cross(axis).normalized()
}
