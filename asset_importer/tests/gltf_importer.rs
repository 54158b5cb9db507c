use std::path::Path;

use asset_common::scene::{MeshPrimitive, ObjectInstance};
use asset_importer::{GltfImporter, ImportError, Importer};
use base64::Engine as _;
use serde_json::json;
use ultraviolet::Vec3;

/// One triangle, used by two primitives of the same mesh. Node 0 holds the mesh and has
/// node 1 as a translated child.
fn write_two_primitive_gltf(dir: &Path) -> std::path::PathBuf {
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
            { "mesh": 0, "children": [1], "name": "root" },
            { "translation": [0.0, 2.0, 0.0], "name": "child" }
        ],
        "meshes": [{
            "primitives": [
                { "attributes": { "POSITION": 0 }, "indices": 1 },
                { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }
            ]
        }],
        "materials": [{ "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }],
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

    let path = dir.join("two_primitives.gltf");
    std::fs::write(&path, document.to_string()).expect("write gltf");
    path
}

#[test]
fn primitives_become_meshes_and_extra_objects() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = write_two_primitive_gltf(temp_dir.path());

    let mut importer = GltfImporter::new();
    importer.open_file(&path).expect("gltf should open");

    assert_eq!(importer.mesh_count(), 2);
    assert_eq!(importer.material_count(), 1);
    assert_eq!(importer.texture_count(), 0);
    assert_eq!(importer.object_count(), 3);
    assert_eq!(importer.default_scene(), Some(0));
    assert_eq!(importer.scene(0).unwrap().children, vec![0]);

    let mesh = importer.mesh(0).unwrap();
    assert_eq!(mesh.primitive, MeshPrimitive::Triangles);
    assert_eq!(mesh.positions[1], Vec3::unit_x());
    assert_eq!(mesh.indices, vec![0, 1, 2]);

    let root = importer.object3d(0).unwrap();
    assert_eq!(
        root.instance,
        ObjectInstance::Mesh {
            mesh: 0,
            material: None
        }
    );
    assert_eq!(root.children, vec![2, 1]);
    assert_eq!(importer.object3d_name(0).as_deref(), Some("root"));

    let extra = importer.object3d(2).unwrap();
    assert_eq!(
        extra.instance,
        ObjectInstance::Mesh {
            mesh: 1,
            material: Some(0)
        }
    );

    let child = importer.object3d(1).unwrap();
    assert_eq!(child.instance, ObjectInstance::Empty);
    assert_eq!(
        child.transform.transform_point3(Vec3::zero()),
        Vec3::new(0.0, 2.0, 0.0)
    );

    let material = importer.material(0).unwrap();
    assert_eq!(material.pbr.unwrap().base_color.x, 1.0);
    assert!(material.phong.is_some());
}

#[test]
fn broken_files_fail_to_open() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("broken.gltf");
    std::fs::write(&path, "{ not json").expect("write file");

    let mut importer = GltfImporter::new();
    assert!(matches!(
        importer.open_file(&path),
        Err(ImportError::Gltf { .. })
    ));
    assert!(importer.object3d(0).is_none());
}
