mod common;

use common::{png_bytes, triangle_asset, GltfBuilder, CLAMP_TO_EDGE, LINEAR, LINEAR_MIPMAP_LINEAR, REPEAT};
use glam::{Mat4, Vec3};
use scenepool::assets::mega_buffer::PooledPrimitive;
use scenepool::assets::{import_scene, LoaderThread};
use scenepool::gpu::{GpuDevice, HeadlessDevice};
use scenepool::{AssetError, AssetPool, PoolConfig, TextureResidencyMode};

fn config() -> PoolConfig {
    PoolConfig {
        decode_workers: Some(2),
        residency: Some(TextureResidencyMode::Bindless),
        ..Default::default()
    }
}

fn pool() -> AssetPool<HeadlessDevice> {
    AssetPool::new(HeadlessDevice::new(), &config())
}

/// Two textured materials on a triangle; the second image is not a PNG.
fn textured_asset(dir: &std::path::Path, corrupt_second: bool) -> std::path::PathBuf {
    let mut gltf = GltfBuilder::new();
    let good = gltf.embedded_image(&png_bytes(4, 4));
    let second = if corrupt_second {
        gltf.embedded_image(b"definitely not a png")
    } else {
        gltf.embedded_image(&png_bytes(8, 2))
    };
    let sampler = gltf.sampler(LINEAR, LINEAR_MIPMAP_LINEAR, REPEAT, REPEAT);
    let t0 = gltf.texture(good, Some(sampler));
    let t1 = gltf.texture(second, Some(sampler));
    let m0 = gltf.material("painted", Some(t0), None);
    let m1 = gltf.material("scuffed", Some(t1), Some(t0));
    let mesh = gltf.mesh(&[
        (vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], Some(vec![0, 1, 2]), Some(m0)),
        (vec![[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]], Some(vec![2, 1, 0]), Some(m1)),
    ]);
    let node = gltf.node(Some(mesh), [0.0; 3], vec![]);
    gltf.root(node);
    gltf.write(dir, "textured.gltf")
}

#[test]
fn two_triangle_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = triangle_asset(dir.path(), "tri.gltf");
    let mut pool = pool();
    pool.add_model_from_file("tri", &path).unwrap();

    assert_eq!(pool.models().len(), 1);
    let model = pool.model("tri").unwrap();
    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.meshes[0].primitives.len(), 1);
    let primitive = model.meshes[0].primitives[0];
    assert_eq!(
        primitive.geometry,
        PooledPrimitive {
            vertex_count: 3,
            vertex_offset: 0,
            index_count: 3,
            index_offset: 0,
        }
    );
    assert_eq!(primitive.material_index, None);
    assert!(pool.materials().cpu().is_empty());
    assert_eq!(pool.cursors(), (3, 3));
}

#[test]
fn duplicate_load_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = textured_asset(dir.path(), false);
    let mut pool = pool();
    pool.add_model_from_file("M", &path).unwrap();

    let cursors = pool.cursors();
    let handles = pool.textures().handles().to_vec();
    let materials = pool.materials().len();
    let model = pool.model("M").cloned();
    let textures_created = pool.device().textures_created;

    pool.add_model_from_file("M", &path).unwrap();

    assert_eq!(pool.cursors(), cursors);
    assert_eq!(pool.textures().handles(), handles.as_slice());
    assert_eq!(pool.materials().len(), materials);
    assert_eq!(pool.models().len(), 1);
    assert_eq!(pool.model("M").cloned(), model);
    assert_eq!(pool.device().textures_created, textures_created);
}

#[test]
fn same_file_under_another_name_loads_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = triangle_asset(dir.path(), "tri.gltf");
    let mut pool = pool();
    pool.add_model_from_file("a", &path).unwrap();
    pool.add_model_from_file("b", &path).unwrap();
    assert_eq!(pool.models().len(), 2);
    assert_eq!(pool.model("b").unwrap().meshes[0].primitives[0].geometry.vertex_offset, 3);
}

#[test]
fn corrupt_image_does_not_fail_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = textured_asset(dir.path(), true);

    let imported = import_scene(&path, 2).unwrap();
    assert_eq!(imported.images[0].width, 4);
    assert_eq!(imported.images[1].width, 0);
    assert!(imported.images[1].pixels.is_empty());

    let mut pool = pool();
    pool.add_model_from_file("scuffed", &path).unwrap();
    assert_eq!(pool.textures().len(), 1);
    assert_eq!(pool.device().textures_created, 1);

    let cpu = &pool.materials().cpu()[1];
    let gpu = &pool.materials().gpu()[1];
    assert_eq!(cpu.base_color_texture, None);
    assert_eq!(gpu.base_color_texture, 0);
    // the normal slot points at the good image and survives
    assert_eq!(cpu.normal_texture, Some(0));
    assert_eq!(gpu.normal_texture, pool.textures().handles()[0]);
    assert_eq!(pool.model("scuffed").unwrap().meshes[0].primitives.len(), 2);
}

#[test]
fn pooled_ranges_never_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let mut gltf = GltfBuilder::new();
    let quad = gltf.mesh(&[(
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        Some(vec![0, 1, 2, 2, 3, 0]),
        None,
    )]);
    let tri = gltf.triangle(None);
    let a = gltf.node(Some(quad), [0.0; 3], vec![]);
    let b = gltf.node(Some(tri), [2.0, 0.0, 0.0], vec![]);
    let parent = gltf.node(None, [0.0; 3], vec![a, b]);
    gltf.root(parent);
    let multi = gltf.write(dir.path(), "multi.gltf");
    let single = triangle_asset(dir.path(), "tri.gltf");
    let textured = textured_asset(dir.path(), false);

    let mut pool = pool();
    pool.add_model_from_file("multi", &multi).unwrap();
    pool.add_model_from_file("single", &single).unwrap();
    pool.add_model_from_file("textured", &textured).unwrap();

    let ranges: Vec<PooledPrimitive> = pool
        .models()
        .iter()
        .flat_map(|m| m.meshes.iter())
        .flat_map(|mesh| mesh.primitives.iter().map(|p| p.geometry))
        .collect();
    assert_eq!(ranges.len(), 5);

    let overlaps = |a: (u32, u32), b: (u32, u32)| a.0 < b.0 + b.1 && b.0 < a.0 + a.1;
    for (i, p) in ranges.iter().enumerate() {
        for q in &ranges[i + 1..] {
            assert!(!overlaps((p.vertex_offset, p.vertex_count), (q.vertex_offset, q.vertex_count)));
            assert!(!overlaps((p.index_offset, p.index_count), (q.index_offset, q.index_count)));
        }
    }
    let (vertices, indices) = pool.cursors();
    assert_eq!(vertices, ranges.iter().map(|p| p.vertex_count).sum::<u32>());
    assert_eq!(indices, ranges.iter().map(|p| p.index_count).sum::<u32>());
}

#[test]
fn world_transform_is_parent_times_local() {
    let dir = tempfile::tempdir().unwrap();
    let mut gltf = GltfBuilder::new();
    let mesh = gltf.triangle(None);
    let b = gltf.node(Some(mesh), [0.0, 2.0, 0.0], vec![]);
    let a = gltf.node(None, [1.0, 0.0, 0.0], vec![b]);
    gltf.root(a);
    let path = gltf.write(dir.path(), "chain.gltf");

    let mut pool = pool();
    pool.add_model_from_file("chain", &path).unwrap();
    let world = pool.model("chain").unwrap().meshes[0].world_matrix;
    let expected = Mat4::from_translation(Vec3::X) * Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
    assert!(world.abs_diff_eq(expected, 1e-6));
}

#[test]
fn shared_mesh_is_pooled_per_node() {
    let dir = tempfile::tempdir().unwrap();
    let mut gltf = GltfBuilder::new();
    // no index accessor: indices are generated
    let mesh = gltf.mesh(&[(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], None, None)]);
    let left = gltf.node(Some(mesh), [-1.0, 0.0, 0.0], vec![]);
    let right = gltf.node(Some(mesh), [1.0, 0.0, 0.0], vec![]);
    gltf.root(left);
    gltf.root(right);
    let path = gltf.write(dir.path(), "pair.gltf");

    let mut pool = pool();
    pool.add_model_from_file("pair", &path).unwrap();
    let model = pool.model("pair").unwrap();
    assert_eq!(model.meshes.len(), 2);
    assert_eq!(model.meshes[0].world_matrix.w_axis.x, -1.0);
    assert_eq!(model.meshes[1].world_matrix.w_axis.x, 1.0);
    assert_eq!(model.meshes[1].primitives[0].geometry.vertex_offset, 3);
    assert_eq!(pool.cursors(), (6, 6));
}

#[test]
fn identical_samplers_are_shared() {
    let dir = tempfile::tempdir().unwrap();
    let mut gltf = GltfBuilder::new();
    let image = gltf.embedded_image(&png_bytes(2, 2));
    let s0 = gltf.sampler(LINEAR, LINEAR_MIPMAP_LINEAR, CLAMP_TO_EDGE, REPEAT);
    let s1 = gltf.sampler(LINEAR, LINEAR_MIPMAP_LINEAR, CLAMP_TO_EDGE, REPEAT);
    let t0 = gltf.texture(image, Some(s0));
    let t1 = gltf.texture(image, Some(s1));
    let t2 = gltf.texture(image, None);
    let m0 = gltf.material("a", Some(t0), Some(t1));
    gltf.material("b", Some(t2), None);
    let mesh = gltf.triangle(Some(m0));
    let node = gltf.node(Some(mesh), [0.0; 3], vec![]);
    gltf.root(node);
    let path = gltf.write(dir.path(), "samplers.gltf");

    let mut pool = pool();
    pool.add_model_from_file("samplers", &path).unwrap();
    // the default sampler plus one shared linear/clamp sampler
    assert_eq!(pool.sampler_count(), 2);
    assert_eq!(pool.device().samplers_created, 2);

    let device = pool.device();
    let targets: Vec<_> = pool
        .textures()
        .handles()
        .iter()
        .map(|h| device.handle_target(*h).unwrap().1)
        .collect();
    assert_eq!(targets[0], targets[1]);
    assert_eq!(targets[2], pool.default_sampler());
}

#[test]
fn material_tables_stay_aligned() {
    let dir = tempfile::tempdir().unwrap();
    let first = textured_asset(dir.path(), false);
    let second_dir = tempfile::tempdir().unwrap();
    let second = textured_asset(second_dir.path(), true);

    let mut pool = pool();
    pool.add_model_from_file("first", &first).unwrap();
    pool.add_model_from_file("second", &second).unwrap();

    let materials = pool.materials();
    let handles = pool.textures().handles();
    assert_eq!(materials.cpu().len(), 4);
    assert_eq!(materials.cpu().len(), materials.gpu().len());
    let names: Vec<_> = materials.cpu().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["painted", "scuffed", "painted", "scuffed"]);

    for (cpu, gpu) in materials.cpu().iter().zip(materials.gpu()) {
        assert_eq!(cpu.base_color, gpu.base_color);
        let gpu_slots = [
            gpu.base_color_texture,
            gpu.normal_texture,
            gpu.occlusion_texture,
            gpu.metallic_roughness_texture,
            gpu.emissive_texture,
        ];
        for (slot, handle) in cpu.slots().into_iter().zip(gpu_slots) {
            match slot {
                Some(index) => {
                    assert_eq!(handle, handles[index]);
                    assert!(pool.device().is_handle_resident(handle));
                }
                None => assert_eq!(handle, 0),
            }
        }
    }

    // material indices on primitives point at the global table
    let second_model = pool.model("second").unwrap();
    let indices: Vec<_> = second_model.meshes[0]
        .primitives
        .iter()
        .map(|p| p.material_index)
        .collect();
    assert_eq!(indices, vec![Some(2), Some(3)]);
}

#[test]
fn bound_unit_mode_skips_residency() {
    let dir = tempfile::tempdir().unwrap();
    let path = textured_asset(dir.path(), false);
    let config = PoolConfig {
        residency: Some(TextureResidencyMode::BoundUnits),
        ..config()
    };
    let mut pool = AssetPool::new(HeadlessDevice::new(), &config);
    pool.add_model_from_file("bound", &path).unwrap();
    assert_eq!(pool.device().resident_handle_count(), 0);
    for (texture, handle) in pool.textures().textures().iter().zip(pool.textures().handles()) {
        assert_eq!(texture.0 as u64, *handle);
    }
}

#[test]
fn failed_load_leaves_registry_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.gltf");
    std::fs::write(&broken, "{ this is not gltf").unwrap();

    let mut pool = pool();
    assert!(matches!(
        pool.add_model_from_file("broken", &broken),
        Err(AssetError::Gltf { .. })
    ));
    assert!(matches!(
        pool.add_model_from_file("missing", &dir.path().join("missing.gltf")),
        Err(AssetError::Io { .. })
    ));
    assert!(pool.models().is_empty());
    assert_eq!(pool.cursors(), (0, 0));
}

#[test]
fn too_small_pool_rejects_whole_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = textured_asset(dir.path(), false);
    let config = PoolConfig {
        vertex_pool_bytes: 32 * 4,
        ..config()
    };
    let mut pool = AssetPool::new(HeadlessDevice::new(), &config);
    assert!(matches!(
        pool.add_model_from_file("big", &path),
        Err(AssetError::PoolExhausted { .. })
    ));
    assert!(pool.textures().is_empty());
    assert!(pool.materials().is_empty());
    assert_eq!(pool.device().textures_created, 0);
}

#[test]
fn background_import_commits_on_caller() {
    let dir = tempfile::tempdir().unwrap();
    let path = triangle_asset(dir.path(), "tri.gltf");
    let loader = LoaderThread::spawn(2);
    assert!(loader.request("tri", &path));
    let response = loader.recv().unwrap();
    assert_eq!(response.name, "tri");

    let mut pool = pool();
    pool.commit(&response.name, response.result.unwrap()).unwrap();
    assert_eq!(pool.model("tri").unwrap().meshes.len(), 1);
}

#[test]
fn draw_list_matches_pooled_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let path = textured_asset(dir.path(), false);
    let mut pool = pool();
    pool.add_model_from_file("textured", &path).unwrap();
    assert_eq!(pool.write_draw_list(&["textured"]).unwrap(), 2);
}

#[test]
fn external_images_resolve_next_to_the_asset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("my tex.png"), png_bytes(4, 4)).unwrap();
    std::fs::create_dir(dir.path().join("maps")).unwrap();
    std::fs::write(dir.path().join("maps").join("plain.png"), png_bytes(6, 2)).unwrap();

    let mut gltf = GltfBuilder::new();
    let spaced = gltf.uri_image("my%20tex.png");
    let plain = gltf.uri_image("maps/plain.png");
    let t0 = gltf.texture(spaced, None);
    let t1 = gltf.texture(plain, None);
    let material = gltf.material("external", Some(t0), Some(t1));
    let mesh = gltf.triangle(Some(material));
    let node = gltf.node(Some(mesh), [0.0; 3], vec![]);
    gltf.root(node);
    let path = gltf.write(dir.path(), "external.gltf");

    let imported = import_scene(&path, 2).unwrap();
    assert_eq!((imported.images[0].width, imported.images[0].height), (4, 4));
    assert_eq!((imported.images[1].width, imported.images[1].height), (6, 2));

    let mut pool = pool();
    pool.add_model_from_file("external", &path).unwrap();
    assert_eq!(pool.textures().len(), 2);
    let cpu = &pool.materials().cpu()[0];
    assert_eq!(cpu.base_color_texture, Some(0));
    assert_eq!(cpu.normal_texture, Some(1));
    let mut widths: Vec<u32> = pool.device().textures.values().map(|t| t.width).collect();
    widths.sort();
    assert_eq!(widths, vec![4, 6]);
}

#[test]
fn binary_container_loads_geometry_and_embedded_image() {
    let dir = tempfile::tempdir().unwrap();
    let mut gltf = GltfBuilder::new();
    let image = gltf.embedded_image(&png_bytes(8, 4));
    let texture = gltf.texture(image, None);
    let material = gltf.material("packed", Some(texture), None);
    let mesh = gltf.triangle(Some(material));
    let node = gltf.node(Some(mesh), [0.0, 2.0, 0.0], vec![]);
    gltf.root(node);
    let path = gltf.write_glb(dir.path(), "packed.glb");

    let mut pool = pool();
    pool.add_model_from_file("packed", &path).unwrap();
    assert_eq!(pool.cursors(), (3, 3));
    assert_eq!(pool.textures().len(), 1);
    let texture = pool.device().textures.values().next().unwrap();
    assert_eq!((texture.width, texture.height), (8, 4));
    assert_eq!(texture.base_level.len(), 8 * 4 * 4);

    let model = pool.model("packed").unwrap();
    assert_eq!(model.meshes[0].world_matrix, Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
    assert_eq!(model.meshes[0].primitives[0].material_index, Some(0));
}
