//! Gesture recognizer abstraction
//!
//! Matching a drawn gesture against stored templates is done by an external
//! recognizer. The store only needs ranked `(name, score)` predictions back.

use crate::gesture_vault::GestureLibrary;
use crate::models::{Gesture, GesturePoint, Prediction};

/// Gesture recognizer capability
pub trait GestureRecognizer: Send + Sync {
    /// Rank every template in `library` against `sample`, best first
    fn recognize(&self, sample: &Gesture, library: &GestureLibrary) -> Vec<Prediction>;
}

/// Score given to a sample identical to a template
pub const MOCK_EXACT_SCORE: f64 = 10.0;

/// Point-distance recognizer for tests and hosts without a native one
///
/// Scores each template by the mean distance between index-aligned points;
/// identical gestures score [`MOCK_EXACT_SCORE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MockRecognizer;

impl MockRecognizer {
    /// Create new mock recognizer
    pub fn new() -> Self {
        Self
    }

    fn score(sample: &Gesture, template: &Gesture) -> f64 {
        let a: Vec<&GesturePoint> = sample.strokes.iter().flat_map(|s| &s.points).collect();
        let b: Vec<&GesturePoint> = template.strokes.iter().flat_map(|s| &s.points).collect();
        if a.is_empty() || b.is_empty() || sample.strokes.len() != template.strokes.len() {
            return 0.0;
        }

        let paired = a.len().min(b.len());
        let distance: f64 = a
            .iter()
            .zip(&b)
            .map(|(p, q)| {
                let dx = f64::from(p.x - q.x);
                let dy = f64::from(p.y - q.y);
                (dx * dx + dy * dy).sqrt()
            })
            .sum::<f64>()
            / paired as f64;
        let missing = a.len().abs_diff(b.len()) as f64;

        MOCK_EXACT_SCORE / (1.0 + distance + missing)
    }
}

impl GestureRecognizer for MockRecognizer {
    fn recognize(&self, sample: &Gesture, library: &GestureLibrary) -> Vec<Prediction> {
        let mut predictions: Vec<Prediction> = library
            .entries()
            .map(|(name, gestures)| Prediction {
                name: name.to_string(),
                score: gestures
                    .iter()
                    .map(|g| Self::score(sample, g))
                    .fold(0.0, f64::max),
            })
            .collect();
        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
        predictions
    }
}
