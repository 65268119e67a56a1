use crate::Cli;
use std::path::PathBuf;

/// Runtime configuration, resolved from the command line.
pub struct Config {
    /// Directory snapshots are written to.
    pub output_dir: PathBuf,
    /// Directory scanned for `<name>.jpg` reference images at startup.
    pub gallery_dir: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Match distance threshold; `None` keeps the engine default.
    pub tolerance: Option<f32>,
    /// Number of warmup frames to discard at startup (camera AGC/AE stabilization).
    pub warmup_frames: usize,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            output_dir: cli.output,
            gallery_dir: cli.gallery_dir,
            camera_device: cli.camera,
            model_dir: cli.model_dir,
            tolerance: cli.tolerance,
            warmup_frames: cli.warmup_frames,
        }
    }
}

impl Config {
    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }
}
