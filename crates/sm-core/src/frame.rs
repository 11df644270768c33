use serde::{Deserialize, Serialize};

/// A single (label, score) pair produced by the classifier.
///
/// # Example
/// ```
/// use sm_core::frame::LabelScore;
/// let l = LabelScore::new("Crowd", 0.8);
/// assert_eq!(l.label, "Crowd");
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LabelScore {
    /// Display name from the vocabulary.
    pub label: String,
    /// Score in [0, 1].
    pub score: f32,
}

impl LabelScore {
    /// Build a label score.
    #[must_use]
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Fixed-length block of samples handed to the classifier.
///
/// Not `Clone`: a window is moved into the classifier and consumed exactly once.
///
/// # Example
/// ```
/// use sm_core::frame::ClassificationWindow;
/// let w = ClassificationWindow::new(vec![0.0; 16000]);
/// assert_eq!(w.len(), 16000);
/// ```
#[derive(Debug)]
pub struct ClassificationWindow {
    samples: Vec<f32>,
}

impl ClassificationWindow {
    /// Wrap a block of mono samples.
    #[must_use]
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// The window samples, mono f32 in [-1, 1].
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if the window holds no sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Release the underlying buffer.
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
