use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use sm_core::{
    ClassificationError, Classifier, LabelScore, MonitorConfig, MonitorEvent, MonitorSnapshot,
};
use triple_buffer::TripleBuffer;

use crate::monitor::{CycleJob, Monitor};

/// Commandes interactives pour le thread du moniteur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorCommand {
    /// Override the sensitivity threshold (0–120).
    SetThreshold(f32),
    /// Stop the driving loop; in-flight results are abandoned.
    Stop,
}

/// Where the driving loop gets its samples from.
///
/// Implemented by : `CaptureReader` (microphone) and test feeders.
pub trait SampleSource: Send + 'static {
    /// Replace `out` with the mono samples that arrived since the last call.
    ///
    /// Returns how many samples were read. Must not block.
    fn read_samples(&mut self, out: &mut Vec<f32>) -> usize;
}

/// Capacité du canal d'événements ; les plus récents sont perdus si l'observateur ne lit pas.
const EVENT_CHANNEL_CAP: usize = 256;

struct JobResult {
    cycle: u64,
    result: Result<Vec<LabelScore>, ClassificationError>,
}

/// Owner side of a running monitor.
///
/// Dropping the handle stops the monitor thread.
pub struct MonitorHandle {
    cmd_tx: flume::Sender<MonitorCommand>,
    snapshot: triple_buffer::Output<MonitorSnapshot>,
    events: flume::Receiver<MonitorEvent>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MonitorHandle {
    /// Latest published snapshot.
    pub fn snapshot(&mut self) -> &MonitorSnapshot {
        self.snapshot.read()
    }

    /// Event stream (status changes, alerts, skipped cycles).
    #[must_use]
    pub fn events(&self) -> &flume::Receiver<MonitorEvent> {
        &self.events
    }

    /// Override the sensitivity threshold at runtime.
    pub fn set_threshold(&self, threshold: f32) {
        let _ = self.cmd_tx.send(MonitorCommand::SetThreshold(threshold));
    }

    /// `true` while the monitor thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for the monitor thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(MonitorCommand::Stop);
        let Some(t) = self.thread.take() else {
            return;
        };
        if t.join().is_err() {
            log::error!("Thread moniteur terminé sur panic");
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the monitor thread and its classification worker.
///
/// The monitor thread owns the pipeline state and ticks every
/// `tick_interval_ms`. The worker owns the classifier; at most one window is
/// in flight. The threshold is re-read from `config` on every tick, other
/// fields are read once here.
///
/// # Errors
/// Returns an error if a thread cannot be spawned.
pub fn spawn_monitor<S, C>(
    source: S,
    classifier: C,
    config: Arc<ArcSwap<MonitorConfig>>,
) -> Result<MonitorHandle>
where
    S: SampleSource,
    C: Classifier,
{
    let (job_tx, job_rx) = flume::bounded::<CycleJob>(1);
    let (res_tx, res_rx) = flume::unbounded::<JobResult>();
    let classifier_name = classifier.name();

    thread::Builder::new()
        .name("sm-classifier".to_string())
        .spawn(move || classifier_loop(classifier, &job_rx, &res_tx))
        .context("Impossible de spawner le thread de classification")?;

    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::bounded(EVENT_CHANNEL_CAP);
    let (snap_in, snap_out) = TripleBuffer::new(&MonitorSnapshot::default()).split();

    let thread = thread::Builder::new()
        .name("sm-monitor".to_string())
        .spawn(move || {
            let mut driver = Driver {
                source,
                config,
                job_tx,
                res_rx,
                cmd_rx,
                event_tx,
                snap_in,
            };
            driver.run();
        })
        .context("Impossible de spawner le thread moniteur")?;

    log::info!("Moniteur démarré (classifieur : {classifier_name})");

    Ok(MonitorHandle {
        cmd_tx,
        snapshot: snap_out,
        events: event_rx,
        thread: Some(thread),
    })
}

/// Classification worker: one job at a time until the monitor goes away.
fn classifier_loop<C: Classifier>(
    mut classifier: C,
    job_rx: &flume::Receiver<CycleJob>,
    res_tx: &flume::Sender<JobResult>,
) {
    while let Ok(job) = job_rx.recv() {
        let started = Instant::now();
        let result = classifier.classify(job.window);
        log::trace!(
            "Cycle {} classifié en {:?}",
            job.cycle,
            started.elapsed()
        );
        if res_tx
            .send(JobResult {
                cycle: job.cycle,
                result,
            })
            .is_err()
        {
            break;
        }
    }
    log::debug!("Thread de classification terminé");
}

struct Driver<S> {
    source: S,
    config: Arc<ArcSwap<MonitorConfig>>,
    job_tx: flume::Sender<CycleJob>,
    res_rx: flume::Receiver<JobResult>,
    cmd_rx: flume::Receiver<MonitorCommand>,
    event_tx: flume::Sender<MonitorEvent>,
    snap_in: triple_buffer::Input<MonitorSnapshot>,
}

impl<S: SampleSource> Driver<S> {
    fn run(&mut self) {
        let initial = self.config.load_full();
        let tick = Duration::from_millis(initial.tick_interval_ms.max(1));
        let timeout = Duration::from_millis(initial.timeout_ms.max(1));
        let mut config_threshold = initial.threshold;
        let mut monitor = Monitor::new(&initial);
        let mut samples: Vec<f32> = Vec::with_capacity(initial.frame_len * 4);

        loop {
            let tick_start = Instant::now();

            if self.process_commands(&mut monitor) {
                break;
            }

            // Hot-reloaded threshold
            let threshold = self.config.load().threshold;
            if (threshold - config_threshold).abs() > f32::EPSILON {
                config_threshold = threshold;
                monitor.set_threshold(threshold);
            }

            // Merge finished classifications
            while let Ok(done) = self.res_rx.try_recv() {
                monitor.complete(done.cycle, done.result);
            }
            monitor.expire_pending(Instant::now(), timeout);

            self.source.read_samples(&mut samples);
            if !samples.is_empty() {
                monitor.observe(&samples);
                self.dispatch(&mut monitor);
            }

            for event in monitor.drain_events() {
                if self.event_tx.try_send(event).is_err() {
                    log::trace!("Canal d'événements plein, événement perdu");
                }
            }
            self.snap_in.write(monitor.snapshot());

            if let Some(remaining) = tick.checked_sub(tick_start.elapsed()) {
                thread::sleep(remaining);
            }
        }

        log::info!("Moniteur arrêté proprement");
    }

    /// Hand a window to the worker if it can take one right now.
    fn dispatch(&self, monitor: &mut Monitor) {
        // A stalled worker keeps the channel full; samples keep accumulating (capped).
        if self.job_tx.is_full() {
            return;
        }
        let Some(job) = monitor.take_window() else {
            return;
        };
        let cycle = job.cycle;
        if self.job_tx.try_send(job).is_err() {
            monitor.complete(cycle, Err(ClassificationError::WorkerGone));
        }
    }

    /// Returns `true` if the loop must stop.
    fn process_commands(&self, monitor: &mut Monitor) -> bool {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(MonitorCommand::SetThreshold(t)) => monitor.set_threshold(t),
                Ok(MonitorCommand::Stop) => {
                    log::info!("Thread moniteur : Stop reçu, arrêt propre.");
                    return true;
                }
                Err(flume::TryRecvError::Empty) => return false,
                Err(flume::TryRecvError::Disconnected) => return true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_core::ClassificationWindow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Feeds the same block on every tick.
    struct Repeat(Vec<f32>);

    impl SampleSource for Repeat {
        fn read_samples(&mut self, out: &mut Vec<f32>) -> usize {
            out.clear();
            out.extend_from_slice(&self.0);
            out.len()
        }
    }

    struct Fixed {
        labels: Vec<LabelScore>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl Classifier for Fixed {
        fn classify(
            &mut self,
            _window: ClassificationWindow,
        ) -> Result<Vec<LabelScore>, ClassificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            Ok(self.labels.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn fast_config() -> Arc<ArcSwap<MonitorConfig>> {
        Arc::new(ArcSwap::from_pointee(MonitorConfig {
            frame_len: 256,
            window_len: 512,
            max_buffered: 2048,
            tick_interval_ms: 2,
            timeout_ms: 50,
            ..MonitorConfig::default()
        }))
    }

    fn wait_for(handle: &mut MonitorHandle, pred: impl Fn(&MonitorSnapshot) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if pred(handle.snapshot()) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn crowd_noise_raises_alert_in_background() {
        let calls = Arc::new(AtomicUsize::new(0));
        let classifier = Fixed {
            labels: vec![LabelScore::new("Crowd", 0.9)],
            delay: Duration::ZERO,
            calls: Arc::clone(&calls),
        };
        let amp = 10f32.powf(-15.0 / 20.0);
        let mut handle = spawn_monitor(Repeat(vec![amp; 256]), classifier, fast_config()).unwrap();

        assert!(wait_for(&mut handle, |s| s.alert && s.loudness == 85));
        assert!(calls.load(Ordering::SeqCst) >= 3);

        let events: Vec<MonitorEvent> = handle.events().try_iter().collect();
        assert!(events.contains(&MonitorEvent::AlertRaised { loudness: 85 }));
        handle.stop();
    }

    #[test]
    fn stalled_classifier_times_out_and_loudness_keeps_updating() {
        let classifier = Fixed {
            labels: vec![LabelScore::new("Crowd", 0.9)],
            delay: Duration::from_millis(400),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let mut handle =
            spawn_monitor(Repeat(vec![0.5; 256]), classifier, fast_config()).unwrap();

        assert!(wait_for(&mut handle, |s| s.loudness > 0));
        let skipped = handle
            .events()
            .recv_timeout(Duration::from_secs(5))
            .ok()
            .into_iter()
            .chain(handle.events().try_iter())
            .any(|e| matches!(e, MonitorEvent::CycleSkipped { .. }));
        assert!(skipped);
        handle.stop();
    }

    #[test]
    fn stop_joins_and_discards_in_flight_work() {
        let classifier = Fixed {
            labels: vec![LabelScore::new("Crowd", 0.9)],
            delay: Duration::from_millis(200),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let mut handle =
            spawn_monitor(Repeat(vec![0.5; 256]), classifier, fast_config()).unwrap();
        assert!(wait_for(&mut handle, |s| s.loudness > 0));
        assert!(handle.is_running());
        handle.stop();
    }

    #[test]
    fn threshold_command_changes_loudness() {
        let classifier = Fixed {
            labels: vec![],
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let amp = 10f32.powf(-15.0 / 20.0);
        let mut handle = spawn_monitor(Repeat(vec![amp; 256]), classifier, fast_config()).unwrap();
        assert!(wait_for(&mut handle, |s| s.loudness == 85));
        handle.set_threshold(120.0);
        assert!(wait_for(&mut handle, |s| s.loudness == 0));
        handle.stop();
    }

    fn with_threshold(config: &ArcSwap<MonitorConfig>, threshold: f32) -> Arc<MonitorConfig> {
        Arc::new(MonitorConfig {
            threshold,
            ..MonitorConfig::clone(&config.load())
        })
    }

    #[test]
    fn reloaded_threshold_is_applied_on_next_tick() {
        let classifier = Fixed {
            labels: vec![],
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let config = fast_config();
        let amp = 10f32.powf(-15.0 / 20.0);
        let mut handle =
            spawn_monitor(Repeat(vec![amp; 256]), classifier, Arc::clone(&config)).unwrap();
        assert!(wait_for(&mut handle, |s| s.loudness == 85));

        config.store(with_threshold(&config, 120.0));
        assert!(wait_for(&mut handle, |s| s.loudness == 0));
        handle.stop();
    }

    #[test]
    fn command_override_survives_reload_with_same_file_threshold() {
        let classifier = Fixed {
            labels: vec![],
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let config = fast_config();
        let amp = 10f32.powf(-15.0 / 20.0);
        let mut handle =
            spawn_monitor(Repeat(vec![amp; 256]), classifier, Arc::clone(&config)).unwrap();
        assert!(wait_for(&mut handle, |s| s.loudness == 85));

        handle.set_threshold(120.0);
        assert!(wait_for(&mut handle, |s| s.loudness == 0));

        // Rechargement qui ne touche pas au seuil
        config.store(Arc::new(MonitorConfig {
            log_capacity: 5,
            ..MonitorConfig::clone(&config.load())
        }));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(handle.snapshot().loudness, 0);

        // Un nouveau seuil dans le fichier reprend la main : 85 × 0.6
        config.store(with_threshold(&config, 90.0));
        assert!(wait_for(&mut handle, |s| s.loudness == 51));
        handle.stop();
    }
}
