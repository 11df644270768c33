use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::group::Group;

/// Configuration complète du moniteur, hot-rechargeable.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use sm_core::config::MonitorConfig;
/// let config = MonitorConfig::default();
/// assert_eq!(config.window_len, 16000);
/// assert!((config.threshold - 70.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MonitorConfig {
    // === Audio ===
    /// Capture sample rate requested from the device (Hz).
    pub sample_rate: u32,
    /// Loudness frame length in samples.
    pub frame_len: usize,
    /// Period of the driving loop, in milliseconds.
    pub tick_interval_ms: u64,
    /// RMS under which a tick is treated as near-silence.
    pub silence_floor: f32,

    // === Loudness ===
    /// Sensitivity threshold on the 0–120 scale. Runtime-adjustable.
    pub threshold: f32,
    /// Offset added to raw dBFS to reach a positive baseline.
    pub db_offset: f32,
    /// Divisor of the sensitivity factor `(120 - threshold) / span`.
    pub sensitivity_span: f32,

    // === Classifier ===
    /// Samples per classification window.
    pub window_len: usize,
    /// When a window is released from the accumulator.
    pub trigger: TriggerPolicy,
    /// Budget for one classifier call, in milliseconds.
    pub timeout_ms: u64,
    /// Accumulator cap; oldest samples are dropped beyond it.
    pub max_buffered: usize,
    /// Number of top labels retained per cycle.
    pub top_n: usize,

    // === Groups ===
    /// Keyword rules per group.
    pub groups: GroupRules,

    // === Alert ===
    /// Consecutive qualifying cycles before the alert is asserted.
    pub hold_limit: u32,
    /// Loudness that must be strictly exceeded to qualify.
    pub loud_threshold: u8,

    // === History ===
    /// Majority-vote history length.
    pub status_capacity: usize,
    /// Event log length.
    pub log_capacity: usize,
}

/// Release policy of the window accumulator.
///
/// # Example
/// ```
/// use sm_core::config::TriggerPolicy;
/// assert_eq!(TriggerPolicy::default(), TriggerPolicy::HalfWindow);
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Release once half a window is buffered (early trigger).
    #[default]
    HalfWindow,
    /// Release once a full window is buffered.
    FullWindow,
    /// Release every `ticks` non-silent ticks, whatever is buffered.
    EveryNthTick {
        /// Ticks between two releases.
        ticks: u32,
    },
}

/// Keywords and weight for one group.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GroupRule {
    /// Case-insensitive substrings matched against label names.
    pub keywords: Vec<String>,
    /// Multiplier applied to each matching label score.
    pub weight: f32,
}

/// One rule per group.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GroupRules {
    pub speech: GroupRule,
    pub crowd: GroupRule,
    pub silent: GroupRule,
}

impl GroupRules {
    /// Rule of `group`.
    #[must_use]
    pub fn get(&self, group: Group) -> &GroupRule {
        match group {
            Group::Speech => &self.speech,
            Group::Crowd => &self.crowd,
            Group::Silent => &self.silent,
        }
    }

    fn get_mut(&mut self, group: Group) -> &mut GroupRule {
        match group {
            Group::Speech => &mut self.speech,
            Group::Crowd => &mut self.crowd,
            Group::Silent => &mut self.silent,
        }
    }
}

fn rule(keywords: &[&str], weight: f32) -> GroupRule {
    GroupRule {
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        weight,
    }
}

impl Default for GroupRules {
    fn default() -> Self {
        Self {
            speech: rule(&["speech", "conversation"], 1.0),
            // Crowd is boosted, silence dampened.
            crowd: rule(&["crowd", "cheering"], 10.0),
            silent: rule(
                &[
                    "silence",
                    "quiet",
                    "ambient",
                    "white noise",
                    "pink noise",
                    "background noise",
                ],
                0.05,
            ),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_len: 1024,
            tick_interval_ms: 64,
            silence_floor: 0.001,
            threshold: 70.0,
            db_offset: 100.0,
            sensitivity_span: 50.0,
            window_len: 16_000,
            trigger: TriggerPolicy::HalfWindow,
            timeout_ms: 5_000,
            max_buffered: 64_000,
            top_n: 10,
            groups: GroupRules::default(),
            hold_limit: 3,
            loud_threshold: 70,
            status_capacity: 3,
            log_capacity: 10,
        }
    }
}

impl MonitorConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.sample_rate = self.sample_rate.clamp(8_000, 192_000);
        self.frame_len = self.frame_len.clamp(64, 16_384);
        self.tick_interval_ms = self.tick_interval_ms.clamp(1, 1_000);
        self.silence_floor = self.silence_floor.clamp(0.0, 1.0);
        self.threshold = self.threshold.clamp(0.0, 120.0);
        self.sensitivity_span = self.sensitivity_span.max(1.0);
        self.window_len = self.window_len.clamp(self.frame_len, 480_000);
        self.timeout_ms = self.timeout_ms.clamp(1, 60_000);
        self.max_buffered = self.max_buffered.max(self.window_len);
        self.top_n = self.top_n.clamp(1, 100);
        if let TriggerPolicy::EveryNthTick { ticks } = &mut self.trigger {
            *ticks = (*ticks).max(1);
        }
        for group in Group::ALL {
            let r = self.groups.get_mut(group);
            r.weight = r.weight.max(0.0);
            r.keywords.retain(|k| !k.trim().is_empty());
        }
        self.hold_limit = self.hold_limit.max(1);
        self.loud_threshold = self.loud_threshold.min(100);
        self.status_capacity = self.status_capacity.clamp(1, 64);
        self.log_capacity = self.log_capacity.clamp(1, 1_000);
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    audio: Option<AudioSection>,
    loudness: Option<LoudnessSection>,
    classifier: Option<ClassifierSection>,
    groups: Option<GroupsSection>,
    alert: Option<AlertSection>,
    history: Option<HistorySection>,
}

#[derive(Deserialize)]
struct AudioSection {
    sample_rate: Option<u32>,
    frame_len: Option<usize>,
    tick_interval_ms: Option<u64>,
    silence_floor: Option<f32>,
}

#[derive(Deserialize)]
struct LoudnessSection {
    threshold: Option<f32>,
    db_offset: Option<f32>,
    sensitivity_span: Option<f32>,
}

#[derive(Deserialize)]
struct ClassifierSection {
    window_len: Option<usize>,
    trigger: Option<TriggerPolicy>,
    timeout_ms: Option<u64>,
    max_buffered: Option<usize>,
    top_n: Option<usize>,
}

#[derive(Deserialize)]
struct GroupsSection {
    speech: Option<GroupRuleSection>,
    crowd: Option<GroupRuleSection>,
    silent: Option<GroupRuleSection>,
}

#[derive(Deserialize)]
struct GroupRuleSection {
    keywords: Option<Vec<String>>,
    weight: Option<f32>,
}

#[derive(Deserialize)]
struct AlertSection {
    hold_limit: Option<u32>,
    loud_threshold: Option<u8>,
}

#[derive(Deserialize)]
struct HistorySection {
    status_capacity: Option<usize>,
    log_capacity: Option<usize>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use sm_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<MonitorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))
}

/// Parse TOML text over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
pub fn parse_config(content: &str) -> Result<MonitorConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = MonitorConfig::default();

    if let Some(a) = file.audio {
        if let Some(v) = a.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = a.frame_len {
            config.frame_len = v;
        }
        if let Some(v) = a.tick_interval_ms {
            config.tick_interval_ms = v;
        }
        if let Some(v) = a.silence_floor {
            config.silence_floor = v;
        }
    }

    if let Some(l) = file.loudness {
        if let Some(v) = l.threshold {
            config.threshold = v;
        }
        if let Some(v) = l.db_offset {
            config.db_offset = v;
        }
        if let Some(v) = l.sensitivity_span {
            config.sensitivity_span = v;
        }
    }

    let mut max_buffered_set = false;
    if let Some(c) = file.classifier {
        if let Some(v) = c.window_len {
            config.window_len = v;
        }
        if let Some(v) = c.trigger {
            config.trigger = v;
        }
        if let Some(v) = c.timeout_ms {
            config.timeout_ms = v;
        }
        if let Some(v) = c.max_buffered {
            config.max_buffered = v;
            max_buffered_set = true;
        }
        if let Some(v) = c.top_n {
            config.top_n = v;
        }
    }
    if !max_buffered_set {
        config.max_buffered = config.window_len.saturating_mul(4);
    }

    if let Some(g) = file.groups {
        for (group, section) in [
            (Group::Speech, g.speech),
            (Group::Crowd, g.crowd),
            (Group::Silent, g.silent),
        ] {
            let Some(section) = section else { continue };
            let r = config.groups.get_mut(group);
            if let Some(v) = section.keywords {
                r.keywords = v;
            }
            if let Some(v) = section.weight {
                r.weight = v;
            }
        }
    }

    if let Some(a) = file.alert {
        if let Some(v) = a.hold_limit {
            config.hold_limit = v;
        }
        if let Some(v) = a.loud_threshold {
            config.loud_threshold = v;
        }
    }

    if let Some(h) = file.history {
        if let Some(v) = h.status_capacity {
            config.status_capacity = v;
        }
        if let Some(v) = h.log_capacity {
            config.log_capacity = v;
        }
    }

    config.clamp_all();
    Ok(config)
}
