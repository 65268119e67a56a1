//! Labeled snapshot capture.
//!
//! A snapshot writes the current frame to `<name>.jpg`, re-reads that file,
//! encodes its first face and appends it to the gallery.

use crate::engine::{EngineError, FaceEngine};
use crate::gallery::{Gallery, IMAGE_EXTENSION};
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("enter a name before taking a snapshot")]
    EmptyName,
    #[error("invalid name {0:?}: must be a plain file name")]
    InvalidName(String),
    #[error("no frame captured yet")]
    NoFrame,
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot read back {path}: {source}")]
    ReadBack {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SnapshotError {
    /// Whether the JPEG was already written when the error occurred.
    pub fn file_written(&self) -> bool {
        matches!(self, SnapshotError::ReadBack { .. } | SnapshotError::Engine(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The face was registered under `name`.
    Added { name: String, path: PathBuf },
    /// The file was written but holds no detectable face.
    NoFace { path: PathBuf },
}

impl SnapshotOutcome {
    pub fn path(&self) -> &Path {
        match self {
            SnapshotOutcome::Added { path, .. } | SnapshotOutcome::NoFace { path } => path,
        }
    }
}

/// Trim `raw` and check it can be used as a file stem.
pub fn validate_name(raw: &str) -> Result<&str, SnapshotError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(SnapshotError::EmptyName);
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(SnapshotError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Capture `frame` under `name` into `output_dir` and register it.
///
/// Validation failures perform no I/O. Once the file is written it is kept
/// even if no face is found in it.
pub fn take_snapshot<E: FaceEngine + ?Sized>(
    name: &str,
    frame: Option<&RgbImage>,
    output_dir: &Path,
    engine: &mut E,
    gallery: &mut Gallery,
) -> Result<SnapshotOutcome, SnapshotError> {
    let name = validate_name(name)?;
    let frame = frame.ok_or(SnapshotError::NoFrame)?;

    let path = output_dir.join(format!("{name}{IMAGE_EXTENSION}"));
    frame
        .save_with_format(&path, image::ImageFormat::Jpeg)
        .map_err(|source| SnapshotError::Write { path: path.clone(), source })?;
    tracing::info!(name, path = %path.display(), "snapshot written");

    let written = image::open(&path)
        .map_err(|source| SnapshotError::ReadBack { path: path.clone(), source })?
        .to_rgb8();
    let embedding = engine.encode_first(&written)?;

    match embedding {
        Some(embedding) => {
            gallery.append(name, embedding);
            tracing::info!(name, entries = gallery.len(), "face added to gallery");
            Ok(SnapshotOutcome::Added { name: name.to_string(), path })
        }
        None => {
            tracing::warn!(name, path = %path.display(), "no face in snapshot; gallery unchanged");
            Ok(SnapshotOutcome::NoFace { path })
        }
    }
}
