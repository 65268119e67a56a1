use anyhow::{Context, Result};
use clap::Parser;
use facetag_core::{Gallery, OnnxFaceEngine};
use facetag_hw::Camera;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod draw;
mod font;
mod panel;
mod ui;

use config::Config;

#[derive(Parser)]
#[command(name = "facetag", about = "Live face recognition with snapshot enrollment")]
struct Cli {
    /// Directory snapshots are written to
    #[arg(short, long, default_value = "./")]
    output: PathBuf,
    /// Directory scanned for <name>.jpg reference images
    #[arg(long, default_value = ".")]
    gallery_dir: PathBuf,
    /// V4L2 camera device
    #[arg(long, default_value = "/dev/video0")]
    camera: String,
    /// Directory holding det_10g.onnx and w600k_r50.onnx
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,
    /// Largest embedding distance accepted as a match
    #[arg(long)]
    tolerance: Option<f32>,
    /// Frames discarded after opening the camera
    #[arg(long, default_value_t = 4)]
    warmup_frames: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from(Cli::parse());
    tracing::info!(camera = %config.camera_device, models = %config.model_dir.display(), "facetag starting");

    let mut camera = match Camera::open(&config.camera_device) {
        Ok(camera) => camera,
        Err(e) => {
            for dev in Camera::list_devices() {
                tracing::info!(path = %dev.path, name = %dev.name, driver = %dev.driver, bus = %dev.bus, "available camera");
            }
            return Err(e).with_context(|| format!("failed to open camera {}", config.camera_device));
        }
    };
    camera.warmup(config.warmup_frames);

    let mut engine = OnnxFaceEngine::load(&config.scrfd_model_path(), &config.arcface_model_path())
        .context("failed to load face models")?;
    if let Some(tolerance) = config.tolerance {
        engine = engine.with_threshold(tolerance);
    }

    let (gallery, report) = Gallery::load_dir(&config.gallery_dir, &mut engine)
        .with_context(|| format!("failed to load gallery from {}", config.gallery_dir.display()))?;
    if report.skipped() > 0 {
        tracing::warn!(
            no_face = report.no_face.len(),
            unreadable = report.unreadable.len(),
            failed = report.failed.len(),
            "some reference images were skipped"
        );
    }

    if !config.output_dir.is_dir() {
        tracing::warn!(dir = %config.output_dir.display(), "output directory does not exist; snapshots will fail");
    }

    let (width, height) = (camera.width, camera.height);
    let mut app = app::App::new(camera, engine, gallery, config.output_dir);
    ui::run(&mut app, width, height)?;

    tracing::info!("facetag exiting");
    Ok(())
}
