//! In-memory gallery of named reference encodings.
//!
//! The gallery is rebuilt at startup from a flat directory of `<name>.jpg`
//! files and only grows afterwards, through [`Gallery::append`].

use crate::engine::{EngineError, FaceEngine};
use crate::types::{Embedding, GalleryEntry, Match};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File suffix that marks a reference image.
pub const IMAGE_EXTENSION: &str = ".jpg";

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What happened while scanning a gallery directory.
#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    pub loaded: usize,
    /// Readable images in which no face was found.
    pub no_face: Vec<PathBuf>,
    /// Files ending in `.jpg` that could not be decoded.
    pub unreadable: Vec<PathBuf>,
    /// Images the engine failed on.
    pub failed: Vec<PathBuf>,
}

impl LoadReport {
    /// Files that registered nothing.
    pub fn skipped(&self) -> usize {
        self.no_face.len() + self.unreadable.len() + self.failed.len()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `dir` for `*.jpg` files and register the first face of each.
    ///
    /// Files without a face, that fail to decode, or that the engine fails
    /// on are skipped with a warning. Entries follow the directory
    /// enumeration order. Only an unreadable directory is an error.
    pub fn load_dir<E: FaceEngine + ?Sized>(
        dir: &Path,
        engine: &mut E,
    ) -> Result<(Self, LoadReport), GalleryError> {
        let read_dir = std::fs::read_dir(dir).map_err(|source| GalleryError::ReadDir {
            dir: dir.to_path_buf(),
            source,
        })?;

        let mut gallery = Gallery::new();
        let mut report = LoadReport::default();

        for entry in read_dir {
            let entry = entry.map_err(|source| GalleryError::ReadDir {
                dir: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let Some(name) = person_name(&path) else {
                continue;
            };
            if !path.is_file() {
                continue;
            }

            match encode_image_file(&path, engine) {
                Ok(Some(embedding)) => {
                    tracing::debug!(name, path = %path.display(), "registered reference face");
                    gallery.append(name, embedding);
                    report.loaded += 1;
                }
                Ok(None) => {
                    tracing::warn!(path = %path.display(), "no face detected in reference image; skipping");
                    report.no_face.push(path);
                }
                Err(GalleryError::Image { path, source }) => {
                    tracing::warn!(path = %path.display(), error = %source, "unreadable reference image; skipping");
                    report.unreadable.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "face engine failed on reference image; skipping");
                    report.failed.push(path);
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            loaded = report.loaded,
            no_face = report.no_face.len(),
            unreadable = report.unreadable.len(),
            failed = report.failed.len(),
            "gallery loaded"
        );

        Ok((gallery, report))
    }

    /// Add one entry. Names are not deduplicated.
    pub fn append(&mut self, name: impl Into<String>, embedding: Embedding) {
        self.entries.push(GalleryEntry {
            name: name.into(),
            embedding,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Distance from `probe` to every entry, in gallery order.
    pub fn distances<E: FaceEngine + ?Sized>(&self, probe: &Embedding, engine: &E) -> Vec<f32> {
        self.entries
            .iter()
            .map(|entry| engine.distance(probe, &entry.embedding))
            .collect()
    }

    /// The nearest entry, if its distance is within the engine's threshold.
    ///
    /// Ties go to the earliest entry. An empty gallery yields `None`.
    pub fn nearest<E: FaceEngine + ?Sized>(&self, probe: &Embedding, engine: &E) -> Option<Match<'_>> {
        let (index, distance) = self
            .distances(probe, engine)
            .into_iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })?;

        (distance <= engine.match_threshold()).then(|| Match {
            index,
            entry: &self.entries[index],
            distance,
        })
    }
}

/// `Alice.jpg` → `Alice`. `None` for anything not ending in `.jpg`.
pub fn person_name(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_suffix(IMAGE_EXTENSION)?;
    (!name.is_empty()).then_some(name)
}

/// Decode an image file and encode its first face.
pub fn encode_image_file<E: FaceEngine + ?Sized>(
    path: &Path,
    engine: &mut E,
) -> Result<Option<Embedding>, GalleryError> {
    let image = image::open(path)
        .map_err(|source| GalleryError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    Ok(engine.encode_first(&image)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{face_image, write_jpeg, StubEngine, ALICE, BOB};
    use crate::types::BoundingBox;
    use image::{Rgb, RgbImage};

    /// Reports two faces side by side; each encodes to its own x position.
    struct TwoFaceEngine {
        encoded: usize,
    }

    impl FaceEngine for TwoFaceEngine {
        fn locate(&mut self, _image: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
            Ok([10.0, 60.0]
                .into_iter()
                .map(|x| BoundingBox { x, y: 10.0, width: 30.0, height: 30.0, confidence: 0.9, landmarks: None })
                .collect())
        }

        fn encode(&mut self, _image: &RgbImage, faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError> {
            self.encoded += faces.len();
            Ok(faces.iter().map(|f| Embedding::new(vec![f.x, 0.0])).collect())
        }

        fn match_threshold(&self) -> f32 {
            1.0
        }
    }

    /// Fails on every image.
    struct BrokenEngine;

    impl FaceEngine for BrokenEngine {
        fn locate(&mut self, _image: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
            Err(EngineError::EncodingCountMismatch { faces: 1, encodings: 0 })
        }

        fn encode(&mut self, _image: &RgbImage, _faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError> {
            Ok(Vec::new())
        }

        fn match_threshold(&self) -> f32 {
            1.0
        }
    }

    #[test]
    fn test_load_two_people() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(dir.path(), "Alice.jpg", &face_image(200, 200, ALICE));
        write_jpeg(dir.path(), "Bob.jpg", &face_image(200, 200, BOB));

        let mut engine = StubEngine::new();
        let (gallery, report) = Gallery::load_dir(dir.path(), &mut engine).unwrap();

        assert_eq!(gallery.len(), 2);
        assert_eq!(report.loaded, 2);
        let mut names: Vec<&str> = gallery.names().collect();
        names.sort();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_faceless_image_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(dir.path(), "Alice.jpg", &face_image(200, 200, ALICE));
        write_jpeg(dir.path(), "Empty.jpg", &RgbImage::new(200, 200));

        let mut engine = StubEngine::new();
        let (gallery, report) = Gallery::load_dir(dir.path(), &mut engine).unwrap();

        assert_eq!(gallery.names().collect::<Vec<_>>(), vec!["Alice"]);
        assert_eq!(report.no_face.len(), 1);
        assert!(report.no_face[0].ends_with("Empty.jpg"));
    }

    #[test]
    fn test_other_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(dir.path(), "Alice.jpg", &face_image(200, 200, ALICE));
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        face_image(200, 200, BOB).save(dir.path().join("Bob.png")).unwrap();
        std::fs::create_dir(dir.path().join("Carol.jpg")).unwrap();

        let mut engine = StubEngine::new();
        let (gallery, _) = Gallery::load_dir(dir.path(), &mut engine).unwrap();
        assert_eq!(gallery.names().collect::<Vec<_>>(), vec!["Alice"]);
    }

    #[test]
    fn test_corrupt_jpeg_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.jpg"), b"not a jpeg").unwrap();

        let mut engine = StubEngine::new();
        let (gallery, report) = Gallery::load_dir(dir.path(), &mut engine).unwrap();
        assert!(gallery.is_empty());
        assert_eq!(report.unreadable.len(), 1);
    }

    #[test]
    fn test_group_photo_registers_first_face_only() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(dir.path(), "Pair.jpg", &face_image(100, 100, ALICE));

        let mut engine = TwoFaceEngine { encoded: 0 };
        let (gallery, report) = Gallery::load_dir(dir.path(), &mut engine).unwrap();

        assert_eq!(report.loaded, 1);
        assert_eq!(gallery.names().collect::<Vec<_>>(), vec!["Pair"]);
        assert_eq!(engine.encoded, 1);

        let first = Embedding::new(vec![10.0, 0.0]);
        let second = Embedding::new(vec![60.0, 0.0]);
        assert_eq!(gallery.distances(&first, &engine), vec![0.0]);
        assert_eq!(gallery.distances(&second, &engine), vec![50.0]);
    }

    #[test]
    fn test_engine_failure_skips_file() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(dir.path(), "Alice.jpg", &face_image(200, 200, ALICE));
        write_jpeg(dir.path(), "Bob.jpg", &face_image(200, 200, BOB));

        let (gallery, report) = Gallery::load_dir(dir.path(), &mut BrokenEngine).unwrap();

        assert!(gallery.is_empty());
        assert_eq!(report.loaded, 0);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.skipped(), 2);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = StubEngine::new();
        let result = Gallery::load_dir(&dir.path().join("nope"), &mut engine);
        assert!(matches!(result, Err(GalleryError::ReadDir { .. })));
    }

    #[test]
    fn test_nearest_within_threshold() {
        let engine = StubEngine::new();
        let mut gallery = Gallery::new();
        gallery.append("Alice", StubEngine::embedding_for(ALICE));
        gallery.append("Bob", StubEngine::embedding_for(BOB));

        let m = gallery.nearest(&StubEngine::embedding_for(Rgb([195, 35, 30])), &engine).unwrap();
        assert_eq!(m.entry.name, "Alice");
        assert_eq!(m.index, 0);
        assert!(m.distance < engine.match_threshold());
    }

    #[test]
    fn test_nearest_beyond_threshold() {
        let engine = StubEngine::new();
        let mut gallery = Gallery::new();
        gallery.append("Alice", StubEngine::embedding_for(ALICE));

        let far = StubEngine::embedding_for(Rgb([140, 90, 30]));
        assert!(gallery.nearest(&far, &engine).is_none());
    }

    #[test]
    fn test_nearest_empty_gallery() {
        let engine = StubEngine::new();
        let gallery = Gallery::new();
        assert!(gallery.distances(&StubEngine::embedding_for(ALICE), &engine).is_empty());
        assert!(gallery.nearest(&StubEngine::embedding_for(ALICE), &engine).is_none());
    }

    #[test]
    fn test_duplicate_names_kept_first_wins_tie() {
        let engine = StubEngine::new();
        let mut gallery = Gallery::new();
        gallery.append("Alice", StubEngine::embedding_for(ALICE));
        gallery.append("Alice", StubEngine::embedding_for(ALICE));
        assert_eq!(gallery.len(), 2);

        let m = gallery.nearest(&StubEngine::embedding_for(ALICE), &engine).unwrap();
        assert_eq!(m.index, 0);
    }

    #[test]
    fn test_person_name() {
        assert_eq!(person_name(Path::new("/x/Alice.jpg")), Some("Alice"));
        assert_eq!(person_name(Path::new("Bob.JPG")), None);
        assert_eq!(person_name(Path::new(".jpg")), None);
        assert_eq!(person_name(Path::new("Carol.jpeg")), None);
    }
}
