use std::time::{Duration, Instant};

use chrono::Local;
use sm_core::{
    ClassificationError, ClassificationWindow, Classifier, Group, GroupTotals, LabelScore,
    MonitorConfig, MonitorEvent, MonitorSnapshot,
};

use crate::alert::AlertMonitor;
use crate::event_log::EventLog;
use crate::loudness::{LoudnessMeter, LoudnessReading};
use crate::scorer::GroupScorer;
use crate::stabilizer::StatusStabilizer;
use crate::window::WindowAccumulator;

/// Pipeline state: every buffer, history and counter, owned by one instance.
///
/// Two ways to drive it:
/// - [`Monitor::step`] runs a whole cycle synchronously with a borrowed classifier;
/// - [`Monitor::observe`] / [`Monitor::take_window`] / [`Monitor::complete`]
///   split the cycle so that classification can run elsewhere (see `state`).
///
/// # Example
/// ```
/// use sm_audio::Monitor;
/// use sm_core::{Group, MonitorConfig};
///
/// let mut monitor = Monitor::new(&MonitorConfig::default());
/// let reading = monitor.observe(&[0.0; 1024]);
/// assert!(reading.silent);
/// assert_eq!(monitor.status(), Group::Silent);
/// ```
pub struct Monitor {
    meter: LoudnessMeter,
    accumulator: WindowAccumulator,
    scorer: GroupScorer,
    stabilizer: StatusStabilizer,
    alert: AlertMonitor,
    log: EventLog,
    threshold: f32,
    frame_len: usize,
    loudness: u8,
    top: Vec<LabelScore>,
    last_totals: GroupTotals,
    next_cycle: u64,
    pending: Option<PendingCycle>,
    cycles: u64,
    skipped: u64,
    events: Vec<MonitorEvent>,
}

/// A released window tagged with its cycle id.
#[derive(Debug)]
pub struct CycleJob {
    pub cycle: u64,
    pub window: ClassificationWindow,
}

#[derive(Clone, Copy, Debug)]
struct PendingCycle {
    cycle: u64,
    dispatched_at: Instant,
    /// Loudness of the tick that released the window.
    loudness: u8,
}

/// What happened to a classification result handed to [`Monitor::complete`].
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Result merged into the shared state.
    Applied {
        /// Winning group of this cycle (raw status).
        raw: Group,
        /// Stabilized status after the vote.
        status: Group,
        /// Alert flag after this cycle.
        alert: bool,
    },
    /// Classification failed; state left untouched.
    Skipped,
    /// Result for a cycle that is no longer pending; discarded.
    Stale,
}

/// Summary of one synchronous [`Monitor::step`].
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// Near-silence: status forced to `Silent`, no classification.
    Silent,
    /// Samples buffered, no window released yet.
    Buffering,
    /// A window was classified.
    Classified(CycleOutcome),
}

impl Monitor {
    /// Build a monitor from the configuration.
    #[must_use]
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            meter: LoudnessMeter::from_config(config),
            accumulator: WindowAccumulator::from_config(config),
            scorer: GroupScorer::new(&config.groups, config.top_n),
            stabilizer: StatusStabilizer::new(config.status_capacity),
            alert: AlertMonitor::new(config.hold_limit, config.loud_threshold),
            log: EventLog::new(config.log_capacity),
            threshold: config.threshold,
            frame_len: config.frame_len.max(1),
            loudness: 0,
            top: Vec::new(),
            last_totals: GroupTotals::default(),
            next_cycle: 1,
            pending: None,
            cycles: 0,
            skipped: 0,
            events: Vec::new(),
        }
    }

    /// Change the loudness sensitivity threshold (0–120).
    pub fn set_threshold(&mut self, threshold: f32) {
        let threshold = threshold.clamp(0.0, 120.0);
        if (threshold - self.threshold).abs() > f32::EPSILON {
            log::info!("Seuil de sensibilité : {:.0} → {threshold:.0}", self.threshold);
            self.threshold = threshold;
        }
    }

    /// Current sensitivity threshold.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Feed the samples that arrived during one tick.
    ///
    /// Loudness is measured over the last `frame_len` samples. On near-silence
    /// the raw status is forced to `Silent` and nothing is buffered;
    /// otherwise every sample is appended to the accumulator.
    pub fn observe(&mut self, samples: &[f32]) -> LoudnessReading {
        let frame = &samples[samples.len().saturating_sub(self.frame_len)..];
        let reading = self.meter.measure(frame, self.threshold);
        self.loudness = reading.level;

        if reading.silent {
            log::trace!("Quasi-silence (rms={:.5}), statut forcé à silent", reading.rms);
            self.apply_status(Group::Silent, reading.level);
        } else {
            self.accumulator.push(samples);
        }
        reading
    }

    /// Release a window for classification if none is in flight and the
    /// trigger policy allows it.
    pub fn take_window(&mut self) -> Option<CycleJob> {
        if self.pending.is_some() {
            return None;
        }
        let window = self.accumulator.try_take_window()?;
        let cycle = self.next_cycle;
        self.next_cycle += 1;
        self.pending = Some(PendingCycle {
            cycle,
            dispatched_at: Instant::now(),
            loudness: self.loudness,
        });
        log::debug!("Cycle {cycle} : fenêtre de {} échantillons envoyée", window.len());
        Some(CycleJob { cycle, window })
    }

    /// `true` while a classification is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Give up on the in-flight cycle if it has exceeded `timeout`.
    ///
    /// Returns `true` if a cycle was abandoned; a late result for it will be
    /// discarded as stale.
    pub fn expire_pending(&mut self, now: Instant, timeout: Duration) -> bool {
        let Some(p) = self.pending else {
            return false;
        };
        if now.saturating_duration_since(p.dispatched_at) < timeout {
            return false;
        }
        self.complete(p.cycle, Err(ClassificationError::TimedOut(timeout)));
        true
    }

    /// Merge the result of cycle `cycle`.
    ///
    /// Only the pending cycle is accepted. A failure skips the cycle: group
    /// totals, status, alert and log keep their previous values. The alert is
    /// judged against the loudness measured when the window was released.
    pub fn complete(
        &mut self,
        cycle: u64,
        result: Result<Vec<LabelScore>, ClassificationError>,
    ) -> CycleOutcome {
        let loudness = match self.pending {
            Some(p) if p.cycle == cycle => {
                self.pending = None;
                p.loudness
            }
            _ => {
                log::warn!("Cycle {cycle} : résultat obsolète ignoré");
                return CycleOutcome::Stale;
            }
        };

        let labels = match result {
            Ok(labels) => labels,
            Err(e) => {
                log::warn!("Cycle {cycle} ignoré : {e}");
                self.skipped += 1;
                self.events.push(MonitorEvent::CycleSkipped {
                    cycle,
                    reason: e.to_string(),
                });
                return CycleOutcome::Skipped;
            }
        };

        let outcome = self.scorer.score(&labels);
        log::debug!(
            "Cycle {cycle} : speech={:.2} crowd={:.2} silent={:.2} → {}",
            outcome.totals.speech,
            outcome.totals.crowd,
            outcome.totals.silent,
            outcome.winner
        );

        self.cycles += 1;
        self.last_totals = outcome.totals;
        self.top = outcome.top;
        self.log.append(Local::now(), outcome.totals);
        let (status, alert) = self.apply_status(outcome.winner, loudness);

        CycleOutcome::Applied {
            raw: outcome.winner,
            status,
            alert,
        }
    }

    /// Run one full cycle synchronously.
    pub fn step<C: Classifier + ?Sized>(
        &mut self,
        samples: &[f32],
        classifier: &mut C,
    ) -> StepOutcome {
        if self.observe(samples).silent {
            return StepOutcome::Silent;
        }
        match self.take_window() {
            Some(job) => {
                let result = classifier.classify(job.window);
                StepOutcome::Classified(self.complete(job.cycle, result))
            }
            None => StepOutcome::Buffering,
        }
    }

    /// Stabilizer and alert update shared by silent ticks and completed cycles.
    fn apply_status(&mut self, raw: Group, loudness: u8) -> (Group, bool) {
        let before = self.stabilizer.current();
        let was_alerting = self.alert.is_alerting();

        let status = self.stabilizer.update(raw);
        let alert = self.alert.update(status, loudness);

        if status != before {
            log::info!("Statut : {before} → {status}");
            self.events.push(MonitorEvent::StatusChanged {
                from: before,
                to: status,
            });
        }
        match (was_alerting, alert) {
            (false, true) => {
                log::warn!("Alerte : bruit de foule trop fort ({loudness} / 100)");
                self.events.push(MonitorEvent::AlertRaised { loudness });
            }
            (true, false) => {
                log::info!("Alerte levée");
                self.events.push(MonitorEvent::AlertCleared);
            }
            _ => {}
        }
        (status, alert)
    }

    /// Take the events emitted since the last call.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, MonitorEvent> {
        self.events.drain(..)
    }

    /// Current loudness [0, 100].
    #[must_use]
    pub fn loudness(&self) -> u8 {
        self.loudness
    }

    /// Current stabilized status.
    #[must_use]
    pub fn status(&self) -> Group {
        self.stabilizer.current()
    }

    /// Current alert flag.
    #[must_use]
    pub fn is_alerting(&self) -> bool {
        self.alert.is_alerting()
    }

    /// Top labels of the most recent completed cycle.
    #[must_use]
    pub fn top_labels(&self) -> &[LabelScore] {
        &self.top
    }

    /// Group totals of the most recent completed cycle.
    #[must_use]
    pub fn last_totals(&self) -> GroupTotals {
        self.last_totals
    }

    /// Rolling group-score history.
    #[must_use]
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Samples currently buffered for the next window.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.accumulator.len()
    }

    /// Copy of everything an observer may read.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            loudness: self.loudness,
            status: self.status(),
            alert: self.is_alerting(),
            top_labels: self.top.clone(),
            event_log: self.log.snapshot(),
            cycles: self.cycles,
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> MonitorConfig {
        MonitorConfig {
            frame_len: 256,
            window_len: 512,
            max_buffered: 2048,
            ..MonitorConfig::default()
        }
    }

    fn loud_frame() -> Vec<f32> {
        vec![10f32.powf(-15.0 / 20.0); 256]
    }

    fn crowd_labels() -> Vec<LabelScore> {
        vec![LabelScore::new("Crowd", 0.9), LabelScore::new("Speech", 0.3)]
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut m = Monitor::new(&small_config());
        m.observe(&loud_frame());
        let job = m.take_window().unwrap();
        assert!(m.take_window().is_none());
        assert_eq!(
            m.complete(job.cycle + 7, Ok(crowd_labels())),
            CycleOutcome::Stale
        );
        assert!(m.is_pending());
        assert!(matches!(
            m.complete(job.cycle, Ok(crowd_labels())),
            CycleOutcome::Applied { raw: Group::Crowd, .. }
        ));
        assert_eq!(m.complete(job.cycle, Ok(crowd_labels())), CycleOutcome::Stale);
    }

    #[test]
    fn failure_skips_cycle_without_touching_state() {
        let mut m = Monitor::new(&small_config());
        m.observe(&loud_frame());
        let job = m.take_window().unwrap();
        m.complete(job.cycle, Ok(crowd_labels()));
        let before = m.snapshot();

        m.observe(&loud_frame());
        let job = m.take_window().unwrap();
        let outcome = m.complete(job.cycle, Err(ClassificationError::Failed("boom".into())));
        assert_eq!(outcome, CycleOutcome::Skipped);

        let after = m.snapshot();
        assert_eq!(after.status, before.status);
        assert_eq!(after.alert, before.alert);
        assert_eq!(after.event_log, before.event_log);
        assert_eq!(after.top_labels, before.top_labels);
        assert_eq!(after.skipped, 1);
        assert!(
            m.drain_events()
                .any(|e| matches!(e, MonitorEvent::CycleSkipped { .. }))
        );
    }

    #[test]
    fn expired_cycle_times_out_and_late_result_is_stale() {
        let mut m = Monitor::new(&small_config());
        m.observe(&loud_frame());
        let job = m.take_window().unwrap();
        let timeout = Duration::from_millis(100);

        assert!(!m.expire_pending(Instant::now(), timeout));
        assert!(m.expire_pending(Instant::now() + Duration::from_secs(1), timeout));
        assert!(!m.is_pending());
        assert_eq!(m.snapshot().skipped, 1);
        assert_eq!(m.complete(job.cycle, Ok(crowd_labels())), CycleOutcome::Stale);
        assert!(m.event_log().is_empty());
    }

    #[test]
    fn buffering_continues_while_pending() {
        let mut m = Monitor::new(&small_config());
        m.observe(&loud_frame());
        let _job = m.take_window().unwrap();
        m.observe(&loud_frame());
        m.observe(&loud_frame());
        assert!(m.take_window().is_none());
        assert_eq!(m.buffered(), 512);
    }

    #[test]
    fn loudness_uses_last_frame_only() {
        let mut m = Monitor::new(&small_config());
        let mut samples = loud_frame();
        samples.extend(vec![0.0; 256]);
        assert!(m.observe(&samples).silent);
        assert_eq!(m.loudness(), 0);
        assert_eq!(m.buffered(), 0);
    }

    fn quiet_frame() -> Vec<f32> {
        // -40 dBFS : niveau 60, au-dessus du plancher de silence
        vec![0.01; 256]
    }

    #[test]
    fn alert_uses_loudness_of_the_releasing_tick() {
        let mut m = Monitor::new(&small_config());
        let mut alerts = Vec::new();
        for _ in 0..3 {
            assert_eq!(m.observe(&loud_frame()).level, 85);
            let job = m.take_window().unwrap();
            assert_eq!(m.observe(&quiet_frame()).level, 60);
            match m.complete(job.cycle, Ok(crowd_labels())) {
                CycleOutcome::Applied { alert, .. } => alerts.push(alert),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(alerts, [false, false, true]);
        assert!(
            m.drain_events()
                .any(|e| e == MonitorEvent::AlertRaised { loudness: 85 })
        );
    }

    #[test]
    fn quiet_window_is_not_promoted_by_a_later_loud_tick() {
        let mut m = Monitor::new(&small_config());
        for _ in 0..3 {
            m.observe(&quiet_frame());
            let job = m.take_window().unwrap();
            m.observe(&loud_frame());
            assert!(matches!(
                m.complete(job.cycle, Ok(crowd_labels())),
                CycleOutcome::Applied {
                    status: Group::Crowd,
                    alert: false,
                    ..
                }
            ));
        }
        assert!(!m.is_alerting());
        assert_eq!(m.loudness(), 85);
    }

    #[test]
    fn threshold_is_clamped() {
        let mut m = Monitor::new(&small_config());
        m.set_threshold(400.0);
        assert!((m.threshold() - 120.0).abs() < f32::EPSILON);
    }

    #[test]
    fn status_change_and_alert_events() {
        let config = MonitorConfig {
            hold_limit: 1,
            ..small_config()
        };
        let mut m = Monitor::new(&config);
        m.observe(&loud_frame());
        let job = m.take_window().unwrap();
        m.complete(job.cycle, Ok(crowd_labels()));
        let events: Vec<MonitorEvent> = m.drain_events().collect();
        assert!(events.contains(&MonitorEvent::StatusChanged {
            from: Group::Silent,
            to: Group::Crowd
        }));
        assert!(events.contains(&MonitorEvent::AlertRaised { loudness: 85 }));

        m.observe(&[0.0; 256]);
        m.observe(&[0.0; 256]);
        let events: Vec<MonitorEvent> = m.drain_events().collect();
        assert!(events.contains(&MonitorEvent::AlertCleared));
    }
}
