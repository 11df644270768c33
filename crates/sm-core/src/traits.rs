use crate::error::ClassificationError;
use crate::frame::{ClassificationWindow, LabelScore};

/// Maps a window of samples to per-label scores.
///
/// Implemented by : `ProcessClassifier` (external inference process) and test doubles.
/// The window is taken by value; resources acquired for one call must be
/// released before returning, on the error path too.
///
/// # Example
/// ```
/// use sm_core::traits::Classifier;
/// use sm_core::frame::{ClassificationWindow, LabelScore};
/// use sm_core::error::ClassificationError;
///
/// struct Always;
/// impl Classifier for Always {
///     fn classify(&mut self, _w: ClassificationWindow) -> Result<Vec<LabelScore>, ClassificationError> {
///         Ok(vec![LabelScore::new("Speech", 1.0)])
///     }
///     fn name(&self) -> &'static str { "always" }
/// }
/// ```
pub trait Classifier: Send + 'static {
    /// Classify one window. Called at most once per window.
    ///
    /// # Errors
    /// Returns a `ClassificationError` if inference fails; the caller skips the cycle.
    fn classify(
        &mut self,
        window: ClassificationWindow,
    ) -> Result<Vec<LabelScore>, ClassificationError>;

    /// Nom lisible pour le debug/logs.
    fn name(&self) -> &'static str;
}
