use std::fmt::Write as _;

use sm_audio::loudness::LoudnessBand;
use sm_core::{Group, MonitorEvent, MonitorSnapshot};

/// Labels shown per report.
const TOP_SHOWN: usize = 5;

/// Status line shown to the user.
#[must_use]
pub fn status_message(status: Group) -> &'static str {
    match status {
        Group::Crowd => "Crowd detected!",
        Group::Speech => "Speech detected",
        Group::Silent => "Quiet / Ambient",
    }
}

/// Human-readable multi-line report of a snapshot.
#[must_use]
pub fn render_text(snap: &MonitorSnapshot) -> String {
    let band = match LoudnessBand::of(snap.loudness) {
        LoudnessBand::Low => "low",
        LoudnessBand::Medium => "medium",
        LoudnessBand::High => "high",
    };
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Sound Level: {} / 100 ({band}) | {}",
        snap.loudness,
        status_message(snap.status)
    );
    if snap.alert {
        let _ = writeln!(out, "!! Crowd noise is too loud!");
    }
    if !snap.top_labels.is_empty() {
        let _ = writeln!(out, "Top Predictions:");
        for item in snap.top_labels.iter().take(TOP_SHOWN) {
            let _ = writeln!(out, "  {}: {:.1}%", item.label, item.score * 100.0);
        }
    }
    if let Some(last) = snap.event_log.last() {
        let _ = writeln!(
            out,
            "Group Score Log: {} entries, last {} | speech {:.2} | crowd {:.2} | silent {:.2}",
            snap.event_log.len(),
            last.time_label(),
            last.totals.speech,
            last.totals.crowd,
            last.totals.silent
        );
    }
    out
}

/// One JSON line per snapshot.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render_json(snap: &MonitorSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(snap)
}

/// Log an event at the level it deserves.
pub fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::StatusChanged { from, to } => {
            log::info!("Statut {from} → {to} : {}", status_message(*to));
        }
        MonitorEvent::AlertRaised { loudness } => {
            log::warn!("ALERTE : Crowd noise is too loud! ({loudness} / 100)");
        }
        MonitorEvent::AlertCleared => log::info!("Alerte terminée"),
        MonitorEvent::CycleSkipped { cycle, reason } => {
            log::debug!("Cycle {cycle} ignoré : {reason}");
        }
    }
}
