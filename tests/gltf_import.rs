use std::path::{Path, PathBuf};

use asset_common::{AssetInfo, AssetType};
use asset_importer::{GltfImporter, Importer};
use base64::Engine as _;
use scene_assets::{
    instancer::{InstanceFlags, RenderAssetInstanceCreationInfo},
    material::{MaterialKey, ShadingKind},
    resource_manager::ResourceManagerConfig,
    scene_graph::{ArenaSceneGraph, LightSetupKey, SceneGraph},
    LoadOutcome, ResourceManager,
};
use serde_json::json;
use ultraviolet::Vec3;

/// A red triangle at the root and the same triangle again on a child moved up by two.
fn write_triangle_gltf(dir: &Path) -> PathBuf {
    let mut buffer = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        buffer.extend_from_slice(&index.to_le_bytes());
    }
    buffer.extend_from_slice(&[0, 0]);

    let uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&buffer)
    );
    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "mesh": 0, "children": [1] },
            { "mesh": 0, "translation": [0.0, 2.0, 0.0] }
        ],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{
            "pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 0.0, 0.0, 1.0],
                "metallicFactor": 0.0
            }
        }],
        "buffers": [{ "byteLength": buffer.len(), "uri": uri }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    });

    let path = dir.join("triangles.gltf");
    std::fs::write(&path, document.to_string()).expect("write gltf");
    path
}

/// Two triangles in one primitive, tagged with object ids 3 and 1 through `_OBJECT_ID`.
fn write_tagged_gltf(dir: &Path) -> PathBuf {
    let mut buffer = Vec::new();
    for x in [0.0f32, 5.0] {
        for value in [x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x, 1.0, 0.0] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
    for id in [3u16, 3, 3, 1, 1, 1] {
        buffer.extend_from_slice(&id.to_le_bytes());
    }
    for index in [0u16, 1, 2, 3, 4, 5] {
        buffer.extend_from_slice(&index.to_le_bytes());
    }

    let uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&buffer)
    );
    let document = json!({
        "asset": { "version": "2.0" },
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0, "_OBJECT_ID": 1 }, "indices": 2 }]
        }],
        "buffers": [{ "byteLength": buffer.len(), "uri": uri }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 72 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 12 },
            { "buffer": 0, "byteOffset": 84, "byteLength": 12 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 6, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [6.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR" },
            { "bufferView": 2, "componentType": 5123, "count": 6, "type": "SCALAR" }
        ]
    });

    let path = dir.join("semantic.gltf");
    std::fs::write(&path, document.to_string()).expect("write gltf");
    path
}

#[test]
fn gltf_object_ids_are_read_per_vertex() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = write_tagged_gltf(temp_dir.path());

    let mut importer = GltfImporter::new();
    importer.open_file(&path).expect("gltf should open");
    let mesh = importer.mesh(0).unwrap();
    assert_eq!(mesh.object_ids, Some(vec![3, 3, 3, 1, 1, 1]));
}

#[test]
fn gltf_instance_meshes_split_by_object_id() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = write_tagged_gltf(temp_dir.path());
    let mut manager = ResourceManager::headless(ResourceManagerConfig::default());
    let info = AssetInfo::new(AssetType::InstanceMesh, path.to_string_lossy())
        .with_split_instance_mesh(true);

    assert_eq!(manager.load_asset(&info).unwrap(), LoadOutcome::Loaded);
    assert_eq!(manager.asset(&info.key()).unwrap().mesh_ids.unwrap().len(), 2);

    // ascending object id, so the triangle tagged 1 comes first
    let joined = manager.create_joined_collision_mesh(&info.key()).unwrap();
    assert_eq!(joined.positions.len(), 6);
    assert_eq!(joined.positions[0], Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(joined.positions[3], Vec3::new(0.0, 0.0, 0.0));
}

#[test]
fn gltf_files_load_and_instance() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = write_triangle_gltf(temp_dir.path());
    let mut manager = ResourceManager::headless(ResourceManagerConfig::default());
    let info = AssetInfo::new(AssetType::GeneralMesh, path.to_string_lossy())
        .with_requires_lighting(true);

    assert_eq!(manager.load_asset(&info).unwrap(), LoadOutcome::Loaded);
    assert_eq!(manager.load_asset(&info).unwrap(), LoadOutcome::Cached);
    assert_eq!(manager.mesh_count(), 1);
    assert_eq!(manager.material_count(), 1);

    let asset = manager.asset(&info.key()).unwrap();
    let material_id = asset.material_ids.unwrap().first;
    let material = manager.material(MaterialKey::Id(material_id)).unwrap();
    assert_eq!(material.shading, ShadingKind::Pbr);

    let joined = manager.create_joined_collision_mesh(&info.key()).unwrap();
    assert_eq!(joined.positions.len(), 6);
    assert_eq!(joined.positions[5], Vec3::new(0.0, 3.0, 0.0));

    let mut graph = ArenaSceneGraph::new();
    let (root, group) = (graph.root(), graph.default_drawables());
    let creation = RenderAssetInstanceCreationInfo::new(
        info.key(),
        InstanceFlags::STATIC | InstanceFlags::RGBD | InstanceFlags::SEMANTIC,
        LightSetupKey::Default,
    );
    manager
        .create_render_asset_instance(&creation, root, &mut graph, group, None)
        .unwrap();

    let drawables = graph.drawables(group);
    assert_eq!(drawables.len(), 2);
    assert!(drawables
        .iter()
        .all(|(_, drawable)| drawable.material == MaterialKey::Id(material_id)));
}

#[test]
fn textures_can_be_skipped() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = write_triangle_gltf(temp_dir.path());
    let mut manager = ResourceManager::headless(ResourceManagerConfig {
        requires_textures: false,
        ..ResourceManagerConfig::default()
    });
    let info = AssetInfo::new(AssetType::GeneralMesh, path.to_string_lossy());
    manager.load_asset(&info).unwrap();

    let asset = manager.asset(&info.key()).unwrap();
    assert!(asset.material_ids.is_none());
    assert_eq!(manager.material_count(), 0);
}
