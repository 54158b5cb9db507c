use anyhow::Context;
use env_logger::Env;
use scene_assets::{
    config_loader::ConfigFileLoader,
    instancer::{InstanceFlags, RenderAssetInstanceCreationInfo},
    physics::NullPhysics,
    scene_graph::SceneGraph,
    stage::{ActiveSceneIds, SceneManager},
    ResourceManager,
};
use ultraviolet::Vec3;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_owned());
    let mut loader = ConfigFileLoader::new(&config_path);
    let config = loader.get_or_load_config()?.clone();

    let mut manager = ResourceManager::headless(config.resource_manager);
    for primitive in config.primitives.iter().cloned() {
        let handle = manager.register_primitive_template(primitive)?;
        log::info!("Registered primitive template {}", handle);
    }

    let mut scenes = SceneManager::new();
    let mut active_scene_ids = ActiveSceneIds::single(scenes.init_scene_graph());
    let mut physics = NullPhysics::default();
    manager
        .load_stage(
            &config.stage,
            Some(&mut physics),
            &mut scenes,
            &mut active_scene_ids,
            config.create_semantic_mesh,
            config.force_separate_semantic_scene_graph,
        )
        .with_context(|| format!("Could not load stage {}", config.stage.handle))?;

    for object in &config.objects {
        manager
            .instantiate_assets_on_demand(object)
            .with_context(|| format!("Could not load the assets of {}", object.handle))?;

        let mut creation = RenderAssetInstanceCreationInfo::new(
            object.render_key(),
            InstanceFlags::SEMANTIC | InstanceFlags::RGBD,
            object.light_setup(),
        );
        if object.scale != Vec3::one() {
            creation = creation.with_scale(object.scale);
        }
        let graph = scenes
            .scene_graph_mut(active_scene_ids.rgbd)
            .context("Color scene graph is missing")?;
        let (root, group) = (graph.root(), graph.default_drawables());
        manager
            .create_render_asset_instance(&creation, root, graph, group, None)
            .with_context(|| format!("Could not instance {}", object.handle))?;
    }

    println!(
        "Loaded {} meshes, {} materials and {} textures into {} scene graphs",
        manager.mesh_count(),
        manager.material_count(),
        manager.texture_count(),
        scenes.len()
    );
    println!(
        "Physics received {} stages with {} triangles",
        physics.stages,
        physics.triangles
    );
    Ok(())
}
