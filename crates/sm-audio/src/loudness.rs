/// Integer loudness on a 0–100 scale, derived from the RMS of a frame.
///
/// `level = clamp(round((20·log10(rms + ε) + offset) · (120 - threshold) / span), 0, 100)`
///
/// # Example
/// ```
/// use sm_audio::loudness::LoudnessMeter;
/// let meter = LoudnessMeter::default();
/// let reading = meter.measure(&[0.0; 1024], 70.0);
/// assert_eq!(reading.level, 0);
/// assert!(reading.silent);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LoudnessMeter {
    db_offset: f32,
    sensitivity_span: f32,
    silence_floor: f32,
}

/// Guard against `log10(0)`.
const EPSILON: f32 = 1e-8;

/// Top of the notional sensitivity scale.
const SENSITIVITY_CEILING: f32 = 120.0;

/// Result of measuring one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoudnessReading {
    /// Loudness in [0, 100].
    pub level: u8,
    /// Raw RMS of the frame.
    pub rms: f32,
    /// RMS fell below the silence floor.
    pub silent: bool,
}

/// Coarse bands used for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoudnessBand {
    Low,
    Medium,
    High,
}

impl LoudnessBand {
    /// Band of a loudness level: < 35 low, < 65 medium, high otherwise.
    #[must_use]
    pub fn of(level: u8) -> Self {
        match level {
            0..35 => LoudnessBand::Low,
            35..65 => LoudnessBand::Medium,
            _ => LoudnessBand::High,
        }
    }
}

impl LoudnessMeter {
    /// Create a meter.
    #[must_use]
    pub fn new(db_offset: f32, sensitivity_span: f32, silence_floor: f32) -> Self {
        Self {
            db_offset,
            sensitivity_span: sensitivity_span.max(1.0),
            silence_floor,
        }
    }

    /// Build from the monitor configuration.
    #[must_use]
    pub fn from_config(config: &sm_core::MonitorConfig) -> Self {
        Self::new(config.db_offset, config.sensitivity_span, config.silence_floor)
    }

    /// Measure a frame at the given sensitivity threshold.
    ///
    /// A frame with a non-finite RMS (NaN or infinite samples) reads as
    /// silence at level 0.
    #[must_use]
    pub fn measure(&self, frame: &[f32], threshold: f32) -> LoudnessReading {
        let rms = rms(frame);
        if !rms.is_finite() {
            return LoudnessReading {
                level: 0,
                rms,
                silent: true,
            };
        }
        LoudnessReading {
            level: self.level_from_rms(rms, threshold),
            rms,
            silent: rms < self.silence_floor,
        }
    }

    /// Loudness level for an RMS value. Non-decreasing in `rms`.
    #[inline]
    #[must_use]
    pub fn level_from_rms(&self, rms: f32, threshold: f32) -> u8 {
        let db = 20.0 * (rms.max(0.0) + EPSILON).log10();
        let normalized = db + self.db_offset;
        let factor =
            (SENSITIVITY_CEILING - threshold.clamp(0.0, SENSITIVITY_CEILING)) / self.sensitivity_span;
        let adjusted = normalized * factor;
        if adjusted.is_nan() {
            return 0;
        }
        adjusted.round().clamp(0.0, 100.0) as u8
    }
}

impl Default for LoudnessMeter {
    fn default() -> Self {
        Self::new(100.0, 50.0, 0.001)
    }
}

/// Root-mean-square amplitude of a frame; 0 for an empty frame.
#[inline]
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
