mod common;

use asset_common::{ids::GlobalId, AssetInfo, AssetType};
use common::{manager_with, triangle, ScriptedAsset, ScriptedImporter};
use scene_assets::{hierarchy::TransformHierarchy, LoadError, LoadOutcome};
use ultraviolet::Vec3;

fn general(path: &str) -> AssetInfo {
    AssetInfo::new(AssetType::GeneralMesh, path)
}

#[test]
fn id_ranges_are_disjoint_and_cover_every_id() {
    let importer = ScriptedImporter::new()
        .with_asset("/assets/a.glb", ScriptedAsset::two_nodes())
        .with_asset("/assets/b.glb", ScriptedAsset::single_mesh(triangle(0.0)))
        .with_asset("/assets/c.glb", ScriptedAsset::two_nodes());
    let mut manager = manager_with(importer);

    for path in ["/assets/a.glb", "/assets/b.glb", "/assets/c.glb"] {
        assert_eq!(manager.load_asset(&general(path)).unwrap(), LoadOutcome::Loaded);
    }

    let assets: Vec<_> = ["/assets/a.glb", "/assets/b.glb", "/assets/c.glb"]
        .iter()
        .map(|path| manager.asset(&general(path).key()).unwrap())
        .collect();

    let mut next_mesh = 0;
    for asset in &assets {
        let range = asset.mesh_ids.unwrap();
        assert_eq!(range.first.index(), next_mesh);
        next_mesh = range.last.index() + 1;
    }
    assert_eq!(next_mesh as usize, manager.mesh_count());

    let mut next_material = 0;
    for asset in &assets {
        if let Some(range) = asset.material_ids {
            assert_eq!(range.first.index(), next_material);
            next_material = range.last.index() + 1;
        }
    }
    assert_eq!(next_material as usize, manager.material_count());
    assert!(assets[1].material_ids.is_none());
    assert_eq!(manager.texture_count(), 0);
}

#[test]
fn identical_descriptors_import_once() {
    let importer = ScriptedImporter::new().with_asset("/assets/a.glb", ScriptedAsset::two_nodes());
    let opened = importer.opened.clone();
    let mut manager = manager_with(importer);

    assert_eq!(manager.load_asset(&general("/assets/a.glb")).unwrap(), LoadOutcome::Loaded);
    assert_eq!(manager.load_asset(&general("/assets/a.glb")).unwrap(), LoadOutcome::Cached);
    assert_eq!(opened.get(), 1);
    assert_eq!(manager.mesh_count(), 2);
}

#[test]
fn conflicting_descriptors_keep_the_first_load() {
    let importer = ScriptedImporter::new().with_asset("/assets/a.glb", ScriptedAsset::two_nodes());
    let opened = importer.opened.clone();
    let mut manager = manager_with(importer);
    let first = general("/assets/a.glb");
    manager.load_asset(&first).unwrap();

    let lit = first.clone().with_requires_lighting(true);
    assert_eq!(manager.load_asset(&lit).unwrap(), LoadOutcome::CachedConflict);
    assert_eq!(opened.get(), 1);
    assert_eq!(manager.asset(&first.key()).unwrap().info, first);
}

#[test]
fn differently_spelled_paths_hit_the_cache() {
    let importer = ScriptedImporter::new().with_asset("/assets/a.glb", ScriptedAsset::two_nodes());
    let opened = importer.opened.clone();
    let mut manager = manager_with(importer);

    manager.load_asset(&general("/assets/a.glb")).unwrap();
    assert_eq!(
        manager.load_asset(&general("/assets/./models/../a.glb")).unwrap(),
        LoadOutcome::Cached
    );
    assert_eq!(opened.get(), 1);
}

#[test]
fn two_node_hierarchy_allocates_per_resource() {
    let importer = ScriptedImporter::new().with_asset("/assets/a.glb", ScriptedAsset::two_nodes());
    let mut manager = manager_with(importer);
    let info = general("/assets/a.glb");
    manager.load_asset(&info).unwrap();

    let asset = manager.asset(&info.key()).unwrap();
    assert_eq!(asset.mesh_ids.unwrap().len(), 2);
    assert_eq!(asset.material_ids.unwrap().len(), 1);
    assert!(asset.texture_ids.is_none());

    let hierarchy = &asset.hierarchy;
    assert_eq!(hierarchy.len(), 3);
    let root_object = hierarchy.root().children[0];
    let parent = hierarchy.node(root_object).unwrap();
    assert_eq!(parent.local_mesh_id, Some(0));
    assert_eq!(parent.local_material_id, Some(0));
    assert_eq!(parent.component_id, Some(0));

    let child = hierarchy.node(parent.children[0]).unwrap();
    assert_eq!(child.local_mesh_id, Some(1));
    assert_eq!(child.local_material_id, None);
    assert_eq!(hierarchy.root().local_mesh_id, None);
    assert_eq!(TransformHierarchy::ROOT, 0);
}

#[test]
fn failed_loads_leave_no_cache_entry() {
    let importer =
        ScriptedImporter::new().with_asset("/assets/empty.glb", ScriptedAsset::default());
    let mut manager = manager_with(importer);

    let empty = general("/assets/empty.glb");
    assert!(matches!(
        manager.load_asset(&empty),
        Err(LoadError::NoSceneOrMeshes(_))
    ));
    assert!(!manager.is_loaded(&empty.key()));

    let missing = general("/assets/missing.glb");
    assert!(matches!(
        manager.load_asset(&missing),
        Err(LoadError::Import { .. })
    ));
    assert!(!manager.is_loaded(&missing.key()));
    assert_eq!(manager.mesh_count(), 0);
}

#[test]
fn scene_less_files_use_their_first_mesh() {
    let importer = ScriptedImporter::new()
        .with_asset("/assets/b.glb", ScriptedAsset::single_mesh(triangle(0.0)));
    let mut manager = manager_with(importer);
    let info = general("/assets/b.glb");
    manager.load_asset(&info).unwrap();

    let asset = manager.asset(&info.key()).unwrap();
    assert_eq!(asset.mesh_ids.unwrap().len(), 1);
    // object 0 does not exist, so the node is skipped
    assert_eq!(asset.hierarchy.len(), 1);
}

#[test]
fn collision_groups_are_built_once_and_stay_equal() {
    let importer = ScriptedImporter::new().with_asset("/assets/a.glb", ScriptedAsset::two_nodes());
    let mut manager = manager_with(importer);
    let info = general("/assets/a.glb");
    manager.load_asset(&info).unwrap();

    let first = manager.get_or_build_collision_group(&info.key()).unwrap().to_vec();
    let second = manager.get_or_build_collision_group(&info.key()).unwrap().to_vec();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    // local frame, the child's translation is not applied
    assert_eq!(first[1].positions[0], Vec3::new(3.0, 0.0, 0.0));
    assert_eq!(manager.collision_group(&info.key()).unwrap().len(), 2);
}

#[test]
fn joined_collision_mesh_concatenates_in_world_space() {
    let importer = ScriptedImporter::new().with_asset("/assets/a.glb", ScriptedAsset::two_nodes());
    let mut manager = manager_with(importer);
    let info = general("/assets/a.glb");
    manager.load_asset(&info).unwrap();

    let joined = manager.create_joined_collision_mesh(&info.key()).unwrap();
    assert_eq!(joined.positions.len(), 6);
    assert_eq!(joined.indices.len(), 6);
    assert!(joined
        .indices
        .iter()
        .all(|&index| (index as usize) < joined.positions.len()));
    assert_eq!(&joined.indices[3..], &[3, 4, 5]);
    assert_eq!(joined.positions[3], Vec3::new(3.0, 1.0, 0.0));
}

#[test]
fn unreadable_meshes_are_left_out_of_collision_geometry() {
    let asset = ScriptedAsset {
        unreadable_meshes: vec![1],
        ..ScriptedAsset::two_nodes()
    };
    let importer = ScriptedImporter::new().with_asset("/assets/a.glb", asset);
    let mut manager = manager_with(importer);
    let info = general("/assets/a.glb");
    assert_eq!(manager.load_asset(&info).unwrap(), LoadOutcome::Loaded);
    assert_eq!(manager.asset(&info.key()).unwrap().mesh_ids.unwrap().len(), 2);

    let group = manager.get_or_build_collision_group(&info.key()).unwrap();
    assert_eq!(group.len(), 1);
    assert_eq!(group[0].positions[0], Vec3::new(0.0, 0.0, 0.0));

    let joined = manager.create_joined_collision_mesh(&info.key()).unwrap();
    assert_eq!(joined.positions.len(), 3);
    assert_eq!(joined.indices, vec![0, 1, 2]);
}
