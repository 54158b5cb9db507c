//! Splitting of per-vertex-object-id meshes into one mesh per object.

use std::collections::{BTreeMap, HashMap};

use asset_common::scene::{MeshData, MeshPrimitive};

#[derive(Default)]
struct SplitMesh {
    mesh: MeshData,
    remap: HashMap<u32, u32>,
}

impl SplitMesh {
    fn vertex(&mut self, source: &MeshData, index: u32) -> u32 {
        if let Some(&mapped) = self.remap.get(&index) {
            return mapped;
        }
        let i = index as usize;
        let mapped = self.mesh.positions.len() as u32;
        self.mesh.positions.push(source.positions[i]);
        copy_attribute(&source.normals, &mut self.mesh.normals, i);
        copy_attribute(&source.tex_coords, &mut self.mesh.tex_coords, i);
        copy_attribute(&source.tangents, &mut self.mesh.tangents, i);
        copy_attribute(&source.bitangents, &mut self.mesh.bitangents, i);
        copy_attribute(&source.colors, &mut self.mesh.colors, i);
        copy_attribute(&source.object_ids, &mut self.mesh.object_ids, i);
        self.remap.insert(index, mapped);
        mapped
    }
}

fn copy_attribute<T: Copy>(source: &Option<Vec<T>>, target: &mut Option<Vec<T>>, index: usize) {
    if let Some(value) = source.as_ref().and_then(|values| values.get(index)) {
        target.get_or_insert_with(Vec::new).push(*value);
    }
}

/// Splits a triangle mesh into one mesh per object id, in ascending id order.
///
/// A triangle belongs to the object of its first vertex. Meshes without object ids, or that
/// are not triangle lists, come back unchanged as the only element.
pub fn split_by_object_id(mesh: &MeshData) -> Vec<MeshData> {
    let Some(object_ids) = mesh.object_ids.as_ref() else {
        return vec![mesh.clone()];
    };
    if mesh.primitive != MeshPrimitive::Triangles {
        return vec![mesh.clone()];
    }

    let mut objects: BTreeMap<u32, SplitMesh> = BTreeMap::new();
    for triangle in mesh.indices.chunks_exact(3) {
        let valid = triangle
            .iter()
            .all(|&index| (index as usize) < mesh.positions.len());
        if !valid {
            log::warn!("Skipping triangle {:?} with out of range indices", triangle);
            continue;
        }
        let object_id = object_ids.get(triangle[0] as usize).copied().unwrap_or(0);
        let split = objects.entry(object_id).or_default();
        for &index in triangle {
            let mapped = split.vertex(mesh, index);
            split.mesh.indices.push(mapped);
        }
    }

    objects.into_values().map(|split| split.mesh).collect()
}
