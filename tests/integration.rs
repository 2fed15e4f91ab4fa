//! Full frame-cycle tests against the reference backend

use std::sync::Arc;

use glam::Vec3;

use rayviz::{
    Camera, CameraType, Cylinder, DirectionalLight, ExtensionParameters, ExtensionPlugin,
    ExtensionPluginFactory, GeometryParameters, Light, MaterialType, PluginConstructor,
    PluginError, ReferenceBackend, ReferenceCamera, Scene, SceneEnvironment, SceneError,
    SceneParameters, Sphere,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reference_scene() -> Scene {
    Scene::new(
        Box::new(ReferenceBackend::new()),
        Arc::new(SceneParameters::default()),
        Arc::new(GeometryParameters::default()),
    )
}

fn reference_camera() -> Camera {
    Camera::new(CameraType::Perspective, Box::new(ReferenceCamera::new()))
}

fn backend(scene: &Scene) -> &ReferenceBackend {
    scene
        .backend()
        .as_any()
        .downcast_ref::<ReferenceBackend>()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Full cycle: mutate → build → commit
// ---------------------------------------------------------------------------

#[test]
fn full_commit_cycle_reaches_the_backend() {
    init_logging();
    let mut scene = reference_scene();
    let mut camera = reference_camera();

    scene.set_materials(MaterialType::Gradient, 4);
    let mut sphere = Sphere::new(Vec3::new(0.0, 1.0, 0.0), 0.5, 2);
    sphere.timestamp = Some(7.0);
    scene.add_sphere(sphere);
    scene.add_cylinder(Cylinder::new(Vec3::ZERO, Vec3::Y, 0.1, 1));
    scene.add_light(Light::Directional(DirectionalLight::default()));
    camera
        .set(Vec3::new(0.0, 2.0, 8.0), Vec3::ZERO, Vec3::Y)
        .unwrap();

    scene.build_geometry().unwrap();
    scene.commit_materials(false).unwrap();
    scene.commit_lights().unwrap();
    camera.commit().unwrap();
    scene.commit().unwrap();

    let backend = backend(&scene);
    assert_eq!(backend.spheres().len(), 1);
    assert_eq!(backend.spheres()[0].timestamp, Some(7.0));
    assert_eq!(backend.cylinders().len(), 1);
    assert_eq!(backend.materials().len(), 4);
    assert_eq!(backend.lights().len(), 1);
    assert_eq!(backend.commit_count(), 1);

    let camera_backend = camera
        .backend()
        .as_any()
        .downcast_ref::<ReferenceCamera>()
        .unwrap();
    assert_eq!(camera_backend.committed().unwrap().0, CameraType::Perspective);
}

#[test]
fn update_only_material_commit_refreshes_in_place() {
    let mut scene = reference_scene();
    scene.set_materials(MaterialType::Default, 3);
    scene.add_sphere(Sphere::new(Vec3::ZERO, 1.0, 0));
    scene.build_geometry().unwrap();
    scene.commit_materials(false).unwrap();
    assert_eq!(backend(&scene).material_generation(), 1);

    // tweak an attribute and refresh without recreating
    scene.get_material(1).unwrap().write().color = Vec3::X;
    scene.commit_materials(true).unwrap();
    let be = backend(&scene);
    assert_eq!(be.material_generation(), 1);
    assert_eq!(be.materials()[1].color, Vec3::X);

    // replacing the registry makes an update-only commit invalid
    scene.set_materials(MaterialType::Default, 5);
    assert!(matches!(
        scene.commit_materials(true),
        Err(SceneError::Backend(_))
    ));
    scene.commit_materials(false).unwrap();
    assert_eq!(backend(&scene).material_generation(), 2);
}

#[test]
fn light_commits_preserve_attachment_order() {
    let mut scene = reference_scene();
    scene.add_sphere(Sphere::new(Vec3::ZERO, 1.0, 0));
    scene.add_light(Light::Directional(DirectionalLight::new(
        -Vec3::Y,
        Vec3::X,
        1.0,
    )));
    scene.add_light(Light::Directional(DirectionalLight::new(
        -Vec3::Y,
        Vec3::Z,
        2.0,
    )));
    scene.build_geometry().unwrap();
    scene.commit_lights().unwrap();
    let be = backend(&scene);
    assert_eq!(be.lights().len(), 2);
    assert_eq!(be.lights()[0].color(), Vec3::X);
    assert_eq!(be.lights()[1].color(), Vec3::Z);
}

#[test]
fn empty_scene_builds_to_empty_and_degenerate_bounds() {
    let mut scene = reference_scene();
    scene.build_geometry().unwrap();
    assert!(scene.is_empty());
    assert!(scene.world_bounds().is_degenerate());
    scene.commit().unwrap();
}

#[test]
fn commit_before_build_is_a_contract_violation() {
    let mut scene = reference_scene();
    assert!(matches!(
        scene.commit_lights(),
        Err(SceneError::GeometryNotBuilt(_))
    ));
    scene.build_geometry().unwrap();
    scene.commit_lights().unwrap();
}

// ---------------------------------------------------------------------------
// Canned scenes
// ---------------------------------------------------------------------------

#[test]
fn default_scene_builds_and_commits() {
    init_logging();
    let mut scene = reference_scene();
    scene.build_default().unwrap();
    scene.build_geometry().unwrap();
    scene.commit_materials(false).unwrap();
    scene.commit_lights().unwrap();
    scene.commit().unwrap();

    assert!(!scene.is_empty());
    assert!(!scene.world_bounds().is_degenerate());
    let be = backend(&scene);
    assert_eq!(be.spheres().len(), 1);
    assert_eq!(be.cylinders().len(), 1);
    assert_eq!(be.cones().len(), 1);
    assert_eq!(be.meshes().len(), 6);
    assert_eq!(be.materials().len(), 10);
    // the transparent sphere
    assert!(be.materials()[6].opacity < 1.0);
}

#[test]
fn box_environment_wraps_existing_geometry() {
    let mut scene = Scene::new(
        Box::new(ReferenceBackend::new()),
        Arc::new(SceneParameters::default()),
        Arc::new(GeometryParameters {
            scene_environment: SceneEnvironment::Box,
            ..Default::default()
        }),
    );
    scene.add_sphere(Sphere::new(Vec3::ZERO, 2.0, 0));
    scene.build_environment();
    scene.build_geometry().unwrap();
    // the environment cube extends beyond the sphere in every direction
    let bounds = scene.world_bounds();
    assert!(bounds.min.x < -2.0 && bounds.max.x > 2.0);
    assert_eq!(backend(&scene).meshes().len(), 1);
}

// ---------------------------------------------------------------------------
// Extension plugins driving the next cycle
// ---------------------------------------------------------------------------

#[test]
fn plugin_mutations_flow_into_the_next_commit() {
    struct Seeder;
    impl ExtensionPlugin for Seeder {
        fn name(&self) -> &str {
            "seeder"
        }
        fn run(&mut self, scene: &mut Scene, camera: &mut Camera) {
            scene.add_sphere(Sphere::new(Vec3::ONE, 0.5, 0));
            camera.set_aperture(0.1);
        }
    }

    let mut scene = reference_scene();
    let mut camera = reference_camera();
    let mut factory = ExtensionPluginFactory::empty();
    factory.add(Box::new(Seeder));

    factory.execute(&mut scene, &mut camera);
    scene.build_geometry().unwrap();
    camera.commit().unwrap();

    assert_eq!(backend(&scene).spheres().len(), 1);
    let committed = camera
        .backend()
        .as_any()
        .downcast_ref::<ReferenceCamera>()
        .unwrap()
        .committed()
        .unwrap();
    assert_eq!(committed.1.aperture, 0.1);
}

#[test]
fn factory_construction_is_best_effort() {
    init_logging();
    struct Noop(&'static str);
    impl ExtensionPlugin for Noop {
        fn name(&self) -> &str {
            self.0
        }
        fn run(&mut self, _scene: &mut Scene, _camera: &mut Camera) {}
    }

    let constructors: Vec<PluginConstructor> = vec![
        Box::new(|_| Ok(Box::new(Noop("control")) as Box<dyn ExtensionPlugin>)),
        Box::new(|_| {
            Err(PluginError::Unsupported {
                plugin: "stream",
                reason: "no display attached".to_string(),
            })
        }),
        Box::new(|_| Ok(Box::new(Noop("telemetry")) as Box<dyn ExtensionPlugin>)),
    ];
    let factory = ExtensionPluginFactory::new(&ExtensionParameters::default(), constructors);
    assert_eq!(factory.len(), 2);
    assert!(factory.contains("control"));
    assert!(factory.contains("telemetry"));
    assert!(!factory.contains("stream"));
}

// ---------------------------------------------------------------------------
// Serializable snapshots
// ---------------------------------------------------------------------------

#[test]
fn camera_snapshot_round_trips_through_json() {
    let mut camera = reference_camera();
    camera
        .set(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)
        .unwrap();
    camera.set_aspect_ratio(16.0 / 9.0);
    camera.set_focal_length(50.0);

    let json = serde_json::to_string(&camera.snapshot()).unwrap();
    let snapshot = serde_json::from_str(&json).unwrap();

    let mut restored = reference_camera();
    restored.apply_snapshot(&snapshot).unwrap();
    assert_eq!(restored.state(), camera.state());
}
