use std::fmt;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// Multiply position, size and landmarks by `factor`.
    pub fn scaled(&self, factor: f32) -> BoundingBox {
        BoundingBox {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
            confidence: self.confidence,
            landmarks: self
                .landmarks
                .map(|lms| lms.map(|(lx, ly)| (lx * factor, ly * factor))),
        }
    }

    /// (top, right, bottom, left) rounded to whole pixels.
    pub fn edges(&self) -> (i32, i32, i32, i32) {
        (
            self.y.round() as i32,
            (self.x + self.width).round() as i32,
            (self.y + self.height).round() as i32,
            self.x.round() as i32,
        )
    }
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A named reference encoding held by the gallery.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub name: String,
    pub embedding: Embedding,
}

/// The gallery entry nearest to a probe, accepted under the match threshold.
#[derive(Debug, Clone, Copy)]
pub struct Match<'g> {
    pub index: usize,
    pub entry: &'g GalleryEntry,
    pub distance: f32,
}

/// What a detected face is displayed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Known(String),
    Unknown,
}

impl Label {
    pub fn is_known(&self) -> bool {
        matches!(self, Label::Known(_))
    }
}

impl From<Option<Match<'_>>> for Label {
    fn from(m: Option<Match<'_>>) -> Self {
        match m {
            Some(m) => Label::Known(m.entry.name.clone()),
            None => Label::Unknown,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Known(name) => f.write_str(name),
            Label::Unknown => f.write_str("Unknown"),
        }
    }
}

/// One face found on an active tick, in downsampled coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: Label,
}
