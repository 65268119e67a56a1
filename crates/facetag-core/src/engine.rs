//! The face engine seam: locate, encode, compare.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;
use thiserror::Error;

/// Euclidean distance under which two unit-length ArcFace embeddings count
/// as the same person (cosine similarity of roughly 0.4).
pub const DEFAULT_MATCH_DISTANCE: f32 = 1.10;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("engine returned {encodings} encodings for {faces} faces")]
    EncodingCountMismatch { faces: usize, encodings: usize },
}

/// Face location, encoding and distance primitives used by the gallery and
/// the recognition loop.
pub trait FaceEngine {
    /// Locate faces in an RGB image, most confident first.
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, EngineError>;

    /// Encode each located face. Returns exactly one embedding per box, in order.
    fn encode(&mut self, image: &RgbImage, faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError>;

    /// Largest distance still accepted as a match.
    fn match_threshold(&self) -> f32;

    fn distance(&self, a: &Embedding, b: &Embedding) -> f32 {
        a.euclidean_distance(b)
    }

    /// Locate, then encode only the first face. `None` when no face is found.
    fn encode_first(&mut self, image: &RgbImage) -> Result<Option<Embedding>, EngineError> {
        let faces = self.locate(image)?;
        let Some(first) = faces.into_iter().next() else {
            return Ok(None);
        };
        Ok(self.encode(image, std::slice::from_ref(&first))?.into_iter().next())
    }
}

/// SCRFD detection + ArcFace encoding over ONNX Runtime.
pub struct OnnxFaceEngine {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    threshold: f32,
}

impl OnnxFaceEngine {
    /// Load both models. Fails fast if either file is missing.
    pub fn load(scrfd_path: &str, arcface_path: &str) -> Result<Self, EngineError> {
        let detector = FaceDetector::load(scrfd_path)?;
        tracing::info!(path = scrfd_path, "SCRFD detector loaded");

        let recognizer = FaceRecognizer::load(arcface_path)?;
        tracing::info!(path = arcface_path, "ArcFace recognizer loaded");

        Ok(Self {
            detector,
            recognizer,
            threshold: DEFAULT_MATCH_DISTANCE,
        })
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl FaceEngine for OnnxFaceEngine {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
        Ok(self.detector.detect(image)?)
    }

    fn encode(&mut self, image: &RgbImage, faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError> {
        faces
            .iter()
            .map(|face| self.recognizer.extract(image, face).map_err(EngineError::from))
            .collect()
    }

    fn match_threshold(&self) -> f32 {
        self.threshold
    }
}
