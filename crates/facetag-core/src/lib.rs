//! facetag-core — Face recognition engine and gallery.
//!
//! Uses SCRFD for face detection and ArcFace for face encoding, both running
//! via ONNX Runtime for CPU inference. On top of the engine sit the in-memory
//! gallery, the per-frame recognition loop and snapshot capture.

pub mod alignment;
pub mod detector;
pub mod engine;
pub mod gallery;
pub mod pipeline;
pub mod recognizer;
pub mod snapshot;
pub mod types;

#[cfg(test)]
mod testing;

pub use engine::{EngineError, FaceEngine, OnnxFaceEngine, DEFAULT_MATCH_DISTANCE};
pub use gallery::{Gallery, GalleryError, LoadReport};
pub use pipeline::{RecognitionLoop, TickKind};
pub use snapshot::{take_snapshot, SnapshotError, SnapshotOutcome};
pub use types::{BoundingBox, Detection, Embedding, GalleryEntry, Label, Match};
