use sm_core::ClassificationWindow;
use sm_core::config::{MonitorConfig, TriggerPolicy};

/// Buffers incoming samples and releases fixed-length classification windows.
///
/// A release slices the first `window_len` samples (zero-padded when fewer are
/// buffered) and clears the whole buffer; samples past the window are dropped.
/// Growth is capped at `max_buffered`, dropping the oldest samples.
///
/// # Example
/// ```
/// use sm_audio::window::WindowAccumulator;
/// use sm_core::config::TriggerPolicy;
///
/// let mut acc = WindowAccumulator::new(2048, 8192, TriggerPolicy::HalfWindow);
/// acc.push(&[0.1; 1024]);
/// let window = acc.try_take_window().unwrap();
/// assert_eq!(window.len(), 2048);
/// assert!(acc.is_empty());
/// ```
pub struct WindowAccumulator {
    buf: Vec<f32>,
    window_len: usize,
    max_buffered: usize,
    trigger: TriggerPolicy,
    /// Pushes since the last release (EveryNthTick).
    pushes: u32,
    /// Samples dropped by the cap since creation.
    overflowed: u64,
}

impl WindowAccumulator {
    /// Create an accumulator.
    #[must_use]
    pub fn new(window_len: usize, max_buffered: usize, trigger: TriggerPolicy) -> Self {
        let window_len = window_len.max(1);
        Self {
            buf: Vec::with_capacity(window_len),
            window_len,
            max_buffered: max_buffered.max(window_len),
            trigger,
            pushes: 0,
            overflowed: 0,
        }
    }

    /// Build from the monitor configuration.
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.window_len, config.max_buffered, config.trigger)
    }

    /// Append all samples of a frame.
    pub fn push(&mut self, frame: &[f32]) {
        self.buf.extend_from_slice(frame);
        self.pushes = self.pushes.saturating_add(1);

        if self.buf.len() > self.max_buffered {
            let excess = self.buf.len() - self.max_buffered;
            self.buf.drain(..excess);
            self.overflowed += excess as u64;
            log::trace!("Accumulateur plein : {excess} échantillons anciens abandonnés");
        }
    }

    /// `true` if the trigger policy would release a window now.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match self.trigger {
            TriggerPolicy::HalfWindow => self.buf.len() >= self.window_len.div_ceil(2),
            TriggerPolicy::FullWindow => self.buf.len() >= self.window_len,
            TriggerPolicy::EveryNthTick { ticks } => {
                !self.buf.is_empty() && self.pushes >= ticks.max(1)
            }
        }
    }

    /// Release a window if the trigger policy allows it.
    ///
    /// On success the buffer is empty afterwards.
    pub fn try_take_window(&mut self) -> Option<ClassificationWindow> {
        if !self.is_ready() {
            return None;
        }

        let take = self.buf.len().min(self.window_len);
        let mut samples = Vec::with_capacity(self.window_len);
        samples.extend_from_slice(&self.buf[..take]);
        samples.resize(self.window_len, 0.0);

        let discarded = self.buf.len() - take;
        if discarded > 0 {
            log::trace!("Fenêtre extraite, {discarded} échantillons excédentaires abandonnés");
        }
        self.buf.clear();
        self.pushes = 0;

        Some(ClassificationWindow::new(samples))
    }

    /// Buffered sample count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Samples dropped by the growth cap so far.
    #[must_use]
    pub fn overflowed(&self) -> u64 {
        self.overflowed
    }

    /// Window length released by [`Self::try_take_window`].
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_at_half_window() {
        let mut acc = WindowAccumulator::new(16_000, 64_000, TriggerPolicy::HalfWindow);
        for _ in 0..7 {
            acc.push(&[0.2; 1024]);
            assert!(acc.try_take_window().is_none());
        }
        // 8 × 1024 = 8192 >= 8000
        acc.push(&[0.2; 1024]);
        let window = acc.try_take_window().unwrap();
        assert_eq!(window.len(), 16_000);
        assert!(acc.is_empty());
        assert!(acc.try_take_window().is_none());
    }

    #[test]
    fn short_buffer_is_zero_padded() {
        let mut acc = WindowAccumulator::new(4, 16, TriggerPolicy::HalfWindow);
        acc.push(&[1.0, 2.0]);
        let window = acc.try_take_window().unwrap();
        assert_eq!(window.samples(), &[1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn samples_past_the_window_are_discarded() {
        let mut acc = WindowAccumulator::new(4, 16, TriggerPolicy::FullWindow);
        acc.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let window = acc.try_take_window().unwrap();
        assert_eq!(window.samples(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(acc.len(), 0);
    }

    #[test]
    fn full_window_waits_for_n() {
        let mut acc = WindowAccumulator::new(8, 32, TriggerPolicy::FullWindow);
        acc.push(&[0.5; 4]);
        assert!(acc.try_take_window().is_none());
        acc.push(&[0.5; 4]);
        assert!(acc.try_take_window().is_some());
    }

    #[test]
    fn every_nth_tick() {
        let mut acc = WindowAccumulator::new(8, 32, TriggerPolicy::EveryNthTick { ticks: 3 });
        acc.push(&[0.5]);
        acc.push(&[0.5]);
        assert!(acc.try_take_window().is_none());
        acc.push(&[0.5]);
        let window = acc.try_take_window().unwrap();
        assert_eq!(window.len(), 8);
        acc.push(&[0.5]);
        assert!(acc.try_take_window().is_none());
    }

    #[test]
    fn cap_drops_oldest() {
        let mut acc = WindowAccumulator::new(4, 6, TriggerPolicy::FullWindow);
        acc.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        acc.push(&[6.0, 7.0, 8.0]);
        assert_eq!(acc.len(), 6);
        assert_eq!(acc.overflowed(), 2);
        let window = acc.try_take_window().unwrap();
        assert_eq!(window.samples(), &[3.0, 4.0, 5.0, 6.0]);
    }
}
