use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No usable audio input: no device, no config, stream refused.
    #[error("Capture audio indisponible : {0}")]
    CaptureUnavailable(String),

    /// Audio stream error.
    #[error("Erreur de stream audio : {0}")]
    StreamError(String),
}
