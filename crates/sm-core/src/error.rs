use std::time::Duration;

use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// The label resource could not be read or parsed at all.
    #[error("Vocabulaire illisible : {0}")]
    VocabularyLoad(String),

    /// Every entry of the label resource was empty or malformed.
    #[error("Vocabulaire vide : aucun label exploitable")]
    EmptyVocabulary,
}

/// Failure of a single classification cycle.
///
/// Always recovered locally: the cycle is skipped and the pipeline keeps
/// its previous stabilized state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    /// The classifier reported a failure.
    #[error("classification failed: {0}")]
    Failed(String),

    /// The classifier did not answer within the configured budget.
    #[error("classification timed out after {0:?}")]
    TimedOut(Duration),

    /// The classifier answered with a score vector that does not match the vocabulary.
    #[error("classifier returned {got} scores, vocabulary has {expected} labels")]
    MalformedOutput {
        /// Number of labels in the vocabulary.
        expected: usize,
        /// Number of scores received.
        got: usize,
    },

    /// The classification worker is no longer running.
    #[error("classification worker unavailable")]
    WorkerGone,
}
