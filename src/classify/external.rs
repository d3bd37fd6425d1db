// src/classify/external.rs
//
// Narrow seam around the generic acoustic-event classifier. Its taxonomy and
// versioning are outside our control, so the fusion gates only ever see a
// class-name -> score map, or nothing.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Class name -> probability from an external classifier
pub type ClassScores = HashMap<String, f32>;

/// A generic acoustic-event classifier
pub trait AcousticEventClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Scores for one analysis window, `None` when the classifier is
    /// unavailable or produced nothing usable.
    fn classify(&self, samples: &[f32], sample_rate: u32) -> Option<ClassScores>;
}

/// No external classifier deployed; the fusion classifier runs degraded
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl AcousticEventClassifier for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn classify(&self, _samples: &[f32], _sample_rate: u32) -> Option<ClassScores> {
        None
    }
}

/// Fixed scores for every window, e.g. precomputed offline for a file
#[derive(Debug, Clone, Default)]
pub struct StaticScores {
    scores: ClassScores,
}

impl StaticScores {
    pub fn new(scores: ClassScores) -> Self {
        Self { scores }
    }

    /// Load a JSON object of `{"class name": score}`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class scores: {}", path.display()))?;
        let scores: ClassScores = serde_json::from_str(&text)
            .with_context(|| format!("Class scores are not a JSON object of numbers: {}", path.display()))?;
        Ok(Self::new(scores))
    }
}

impl AcousticEventClassifier for StaticScores {
    fn name(&self) -> &str {
        "static-scores"
    }

    fn classify(&self, _samples: &[f32], _sample_rate: u32) -> Option<ClassScores> {
        Some(self.scores.clone())
    }
}

/// Treat an empty or all-invalid score map as "no external scores"
pub fn usable_scores(scores: Option<ClassScores>) -> Option<ClassScores> {
    let cleaned: ClassScores = scores?
        .into_iter()
        .filter(|(_, score)| score.is_finite() && *score >= 0.0)
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_returns_nothing() {
        assert!(Unavailable.classify(&[0.0; 16], 16000).is_none());
    }

    #[test]
    fn test_usable_scores_filters_garbage() {
        let mut scores = ClassScores::new();
        scores.insert("Hiss".into(), 0.7);
        scores.insert("Broken".into(), f32::NAN);
        scores.insert("Negative".into(), -1.0);

        let cleaned = usable_scores(Some(scores)).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert!(usable_scores(Some(ClassScores::new())).is_none());
        assert!(usable_scores(None).is_none());
    }

    #[test]
    fn test_static_scores_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(&path, r#"{ "Hiss": 0.8, "Steam": 0.1 }"#).unwrap();

        let classifier = StaticScores::from_json_file(&path).unwrap();
        let scores = classifier.classify(&[], 16000).unwrap();
        assert_eq!(scores.get("Hiss"), Some(&0.8));
    }
}
