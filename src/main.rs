//! Console replica generator.
//!
//! Builds the console and its manual from `config.toml` and writes each as
//! STL meshes plus a `scene.json` manifest. Set `RUST_LOG=debug` to follow
//! every cut and attachment.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use retro_replica::config::{self, Config};
use retro_replica::console::build_console;
use retro_replica::export::export_scene;
use retro_replica::manual::build_manual;
use retro_replica::Workspace;

fn console_scene(ws: &mut Workspace, cfg: &Config) -> retro_replica::Result<()> {
    build_console(ws, &cfg.console)?;
    Ok(())
}

fn manual_scene(ws: &mut Workspace, cfg: &Config) -> retro_replica::Result<()> {
    build_manual(ws, &cfg.manual)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::load_config().context("failed to load configuration")?;
    std::fs::create_dir_all(&cfg.export.output_dir).with_context(|| {
        format!("failed to create output directory {}", cfg.export.output_dir.display())
    })?;

    info!("building scenes");

    type BuildFn = Box<dyn Fn(&mut Workspace, &Config) -> retro_replica::Result<()>>;
    let mut scenes: Vec<(&str, BuildFn)> = vec![("console", Box::new(console_scene))];
    if cfg.manual.enabled {
        scenes.push(("manual", Box::new(manual_scene)));
    }

    let mut ws = Workspace::new();
    for (name, build_fn) in &scenes {
        ws.clear();
        build_fn(&mut ws, &cfg).with_context(|| format!("failed to build {name}"))?;
        let report = export_scene(&ws, name, &cfg.export)
            .with_context(|| format!("failed to export {name}"))?;
        info!(
            scene = *name,
            meshes = report.stl_files.len(),
            manifest = report.manifest.is_some(),
            "exported scene"
        );
    }

    info!("all scenes built");
    Ok(())
}
