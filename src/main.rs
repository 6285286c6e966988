use std::path::{Path, PathBuf};

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

use scenepool::assets::LoaderThread;
use scenepool::gpu::{GpuDevice, HeadlessDevice, WgpuDevice};
use scenepool::{AssetPool, PoolConfig};

#[derive(Parser, Debug)]
#[command(name = "scenepool")]
#[command(about = "Loads glTF scenes into pooled GPU buffers and reports where everything landed")]
struct Args {
    /// glTF or GLB files; each is registered under its file stem
    #[arg(required = true)]
    models: Vec<PathBuf>,

    /// JSON file with pool sizes and residency overrides
    #[arg(long, env = "SCENEPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Use the in-memory device instead of a GPU
    #[arg(long)]
    headless: bool,

    /// Import on the loader thread and commit on the main thread
    #[arg(long)]
    background: bool,
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_all<D: GpuDevice>(pool: &mut AssetPool<D>, args: &Args, workers: usize) {
    if args.background {
        let loader = LoaderThread::spawn(workers);
        let mut pending = 0;
        for path in &args.models {
            if loader.request(model_name(path), path.clone()) {
                pending += 1;
            }
        }
        while pending > 0 {
            let Some(response) = loader.recv() else {
                break;
            };
            pending -= 1;
            if let Ok(scene) = response.result {
                if let Err(e) = pool.commit(&response.name, scene) {
                    error!("failed to commit '{}': {}", response.name, e);
                }
            }
        }
    } else {
        for path in &args.models {
            // errors are already logged by the pool
            let _ = pool.add_model_from_file(&model_name(path), path);
        }
    }
}

fn run<D: GpuDevice>(device: D, config: &PoolConfig, args: &Args) {
    let mut pool = AssetPool::new(device, config);
    load_all(&mut pool, args, config.worker_count());

    let names: Vec<String> = pool.models().names().to_vec();
    for name in &names {
        let Some(model) = pool.model(name) else { continue };
        info!("model '{}': {} meshes", name, model.meshes.len());
        for mesh in &model.meshes {
            for primitive in &mesh.primitives {
                let g = primitive.geometry;
                info!(
                    "  {}: vertices {}+{}, indices {}+{}, material {:?}",
                    mesh.name, g.vertex_offset, g.vertex_count, g.index_offset, g.index_count, primitive.material_index
                );
            }
        }
    }
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    match pool.write_draw_list(&name_refs) {
        Ok(count) => info!("{} draw commands written", count),
        Err(e) => error!("draw list not written: {}", e),
    }

    let (vertices, indices) = pool.cursors();
    info!(
        "{} models, {} textures, {} materials, {} samplers, {} vertices, {} indices",
        pool.models().len(),
        pool.textures().len(),
        pool.materials().len(),
        pool.sampler_count(),
        vertices,
        indices
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PoolConfig::load(path)?,
        None => PoolConfig::default(),
    };

    if args.headless {
        run(HeadlessDevice::new(), &config, &args);
        return Ok(());
    }
    match WgpuDevice::new_blocking() {
        Ok(device) => run(device, &config, &args),
        Err(e) => {
            warn!("no GPU available ({}), falling back to the headless device", e);
            run(HeadlessDevice::new(), &config, &args);
        }
    }
    Ok(())
}
