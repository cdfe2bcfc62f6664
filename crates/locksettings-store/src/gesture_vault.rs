//! Gesture template storage
//!
//! Each user has one template file holding a small named gesture library.
//! The lock gesture is always stored under [`LOCK_GESTURE_NAME`], replacing
//! any earlier entry with that name.

use crate::hash_vault::{remove_file_if_exists, write_file};
use crate::models::{Gesture, UserId};
use crate::paths::UserPaths;
use crate::recognizer::GestureRecognizer;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Reserved template name of the lock gesture
pub const LOCK_GESTURE_NAME: &str = "lock_gesture";

/// Named collection of gesture templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureLibrary {
    entries: BTreeMap<String, Vec<Gesture>>,
}

impl GestureLibrary {
    /// Load from `path`; a missing or empty file is an empty library
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        if raw.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Atomically write to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_vec(self)?;
        write_file(path, &raw)
    }

    /// Templates stored under `name`
    pub fn gestures(&self, name: &str) -> Option<&[Gesture]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Append a template under `name`
    pub fn add_gesture(&mut self, name: &str, gesture: Gesture) {
        self.entries.entry(name.to_string()).or_default().push(gesture);
    }

    /// Drop every template stored under `name`
    pub fn remove_entry(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Iterate `(name, templates)` pairs
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[Gesture])> {
        self.entries
            .iter()
            .map(|(name, gestures)| (name.as_str(), gestures.as_slice()))
    }

    /// Whether no template is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-user gesture template files
pub struct GestureVault {
    paths: UserPaths,
    min_prediction_score: f64,
}

impl GestureVault {
    /// Create vault; matches must score strictly above `min_prediction_score`
    pub fn new(paths: UserPaths, min_prediction_score: f64) -> Self {
        Self {
            paths,
            min_prediction_score,
        }
    }

    /// Replace the lock gesture of `user_id`
    ///
    /// An empty sample leaves the stored template untouched.
    pub fn set_gesture(&self, sample: &Gesture, user_id: UserId) -> Result<()> {
        if sample.is_empty() {
            tracing::debug!(user_id, "Ignoring empty lock gesture");
            return Ok(());
        }

        let path = self.paths.gesture_file(user_id);
        let mut library = GestureLibrary::load(&path)?;
        if library.gestures(LOCK_GESTURE_NAME).is_some() {
            library.remove_entry(LOCK_GESTURE_NAME);
        }
        library.add_gesture(LOCK_GESTURE_NAME, sample.clone());
        library.save(&path)?;

        tracing::debug!(user_id, "Stored lock gesture");
        Ok(())
    }

    /// Whether `sample` unlocks `user_id`
    pub fn check_gesture(
        &self,
        sample: &Gesture,
        user_id: UserId,
        recognizer: &dyn GestureRecognizer,
    ) -> Result<bool> {
        let library = GestureLibrary::load(&self.paths.gesture_file(user_id))?;
        let predictions = recognizer.recognize(sample, &library);

        Ok(predictions.first().is_some_and(|top| {
            top.score > self.min_prediction_score && top.name == LOCK_GESTURE_NAME
        }))
    }

    /// Whether a non-empty template file exists
    pub fn have_gesture(&self, user_id: UserId) -> bool {
        std::fs::metadata(self.paths.gesture_file(user_id))
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    /// Delete the template file of `user_id`, logging failures
    pub fn remove_gesture(&self, user_id: UserId) {
        remove_file_if_exists(&self.paths.gesture_file(user_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prediction;
    use crate::recognizer::MockRecognizer;
    use tempfile::{tempdir, TempDir};

    struct FixedRecognizer(Vec<Prediction>);

    impl GestureRecognizer for FixedRecognizer {
        fn recognize(&self, _sample: &Gesture, _library: &GestureLibrary) -> Vec<Prediction> {
            self.0.clone()
        }
    }

    fn vault() -> (TempDir, GestureVault) {
        let dir = tempdir().unwrap();
        let vault = GestureVault::new(UserPaths::new(dir.path()), 2.0);
        (dir, vault)
    }

    fn zigzag() -> Gesture {
        Gesture::from_points(&[(0.0, 0.0, 0), (5.0, 5.0, 5), (10.0, 0.0, 10), (15.0, 5.0, 15)])
    }

    #[test]
    fn test_set_keeps_single_entry() {
        let (dir, vault) = vault();
        vault.set_gesture(&zigzag(), 10).unwrap();
        vault
            .set_gesture(&Gesture::from_points(&[(1.0, 1.0, 0), (2.0, 2.0, 1)]), 10)
            .unwrap();

        let library = GestureLibrary::load(&UserPaths::new(dir.path()).gesture_file(10)).unwrap();
        assert_eq!(library.gestures(LOCK_GESTURE_NAME).unwrap().len(), 1);
        assert!(vault.have_gesture(10));
    }

    #[test]
    fn test_check_with_mock_recognizer() {
        let (_dir, vault) = vault();
        vault.set_gesture(&zigzag(), 0).unwrap();

        assert!(vault.check_gesture(&zigzag(), 0, &MockRecognizer).unwrap());
        let scribble = Gesture::from_points(&[(300.0, 300.0, 0), (310.0, 290.0, 5)]);
        assert!(!vault.check_gesture(&scribble, 0, &MockRecognizer).unwrap());
    }

    #[test]
    fn test_score_must_exceed_threshold() {
        let (_dir, vault) = vault();
        let at_threshold = FixedRecognizer(vec![Prediction {
            name: LOCK_GESTURE_NAME.to_string(),
            score: 2.0,
        }]);
        assert!(!vault.check_gesture(&zigzag(), 0, &at_threshold).unwrap());

        let above = FixedRecognizer(vec![Prediction {
            name: LOCK_GESTURE_NAME.to_string(),
            score: 2.5,
        }]);
        assert!(vault.check_gesture(&zigzag(), 0, &above).unwrap());
    }

    #[test]
    fn test_top_prediction_must_be_lock_gesture() {
        let (_dir, vault) = vault();
        let recognizer = FixedRecognizer(vec![
            Prediction {
                name: "other".to_string(),
                score: 9.0,
            },
            Prediction {
                name: LOCK_GESTURE_NAME.to_string(),
                score: 8.0,
            },
        ]);
        assert!(!vault.check_gesture(&zigzag(), 0, &recognizer).unwrap());
        assert!(!vault
            .check_gesture(&zigzag(), 0, &FixedRecognizer(Vec::new()))
            .unwrap());
    }

    #[test]
    fn test_empty_sample_is_ignored() {
        let (_dir, vault) = vault();
        vault.set_gesture(&Gesture::default(), 3).unwrap();
        assert!(!vault.have_gesture(3));
    }

    #[test]
    fn test_corrupt_template_file_is_an_error() {
        let (dir, vault) = vault();
        let path = UserPaths::new(dir.path()).gesture_file(0);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        assert!(vault.set_gesture(&zigzag(), 0).is_err());
    }

    #[test]
    fn test_remove_gesture() {
        let (_dir, vault) = vault();
        vault.set_gesture(&zigzag(), 12).unwrap();
        vault.remove_gesture(12);
        assert!(!vault.have_gesture(12));
    }
}
