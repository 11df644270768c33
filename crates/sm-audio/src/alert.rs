use sm_core::Group;

/// Phase of the alert state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertPhase {
    /// Counter at zero, no alert.
    Idle,
    /// Qualifying cycles seen, not yet enough.
    Accumulating,
    /// Alert asserted.
    Alerting,
}

/// Hysteresis on the crowd-noise condition.
///
/// A cycle qualifies when the stabilized status is `Crowd` and loudness is
/// strictly above `loud_threshold`. The alert is asserted on the
/// `hold_limit`-th consecutive qualifying cycle and released on the first
/// cycle that does not qualify.
///
/// # Example
/// ```
/// use sm_audio::alert::AlertMonitor;
/// use sm_core::Group;
///
/// let mut alert = AlertMonitor::new(3, 70);
/// assert!(!alert.update(Group::Crowd, 85));
/// assert!(!alert.update(Group::Crowd, 85));
/// assert!(alert.update(Group::Crowd, 85));
/// assert!(!alert.update(Group::Speech, 85));
/// ```
pub struct AlertMonitor {
    counter: u32,
    alert: bool,
    hold_limit: u32,
    loud_threshold: u8,
}

impl AlertMonitor {
    /// Create an idle monitor.
    #[must_use]
    pub fn new(hold_limit: u32, loud_threshold: u8) -> Self {
        Self {
            counter: 0,
            alert: false,
            hold_limit: hold_limit.max(1),
            loud_threshold,
        }
    }

    /// Advance one cycle and return the alert flag.
    pub fn update(&mut self, status: Group, loudness: u8) -> bool {
        if status == Group::Crowd && loudness > self.loud_threshold {
            self.counter = self.counter.saturating_add(1);
            if self.counter >= self.hold_limit {
                self.alert = true;
            }
        } else {
            self.counter = 0;
            self.alert = false;
        }
        self.alert
    }

    /// Current alert flag.
    #[must_use]
    pub fn is_alerting(&self) -> bool {
        self.alert
    }

    /// Consecutive qualifying cycles.
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> AlertPhase {
        match (self.counter, self.alert) {
            (_, true) => AlertPhase::Alerting,
            (0, false) => AlertPhase::Idle,
            _ => AlertPhase::Accumulating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_hold_limit_consecutive_cycles() {
        let mut a = AlertMonitor::new(3, 70);
        assert!(!a.update(Group::Crowd, 71));
        assert_eq!(a.phase(), AlertPhase::Accumulating);
        assert!(!a.update(Group::Crowd, 90));
        assert!(a.update(Group::Crowd, 100));
        assert_eq!(a.phase(), AlertPhase::Alerting);
        assert!(a.update(Group::Crowd, 100));
        assert_eq!(a.counter(), 4);
    }

    #[test]
    fn disqualifying_cycle_resets_immediately() {
        let mut a = AlertMonitor::new(3, 70);
        a.update(Group::Crowd, 85);
        a.update(Group::Crowd, 85);
        assert!(!a.update(Group::Silent, 85));
        assert_eq!(a.phase(), AlertPhase::Idle);

        for _ in 0..3 {
            a.update(Group::Crowd, 85);
        }
        assert!(a.is_alerting());
        assert!(!a.update(Group::Crowd, 70));
        assert_eq!(a.counter(), 0);
        assert_eq!(a.phase(), AlertPhase::Idle);
    }

    #[test]
    fn loudness_must_be_strictly_above() {
        let mut a = AlertMonitor::new(1, 70);
        assert!(!a.update(Group::Crowd, 70));
        assert!(a.update(Group::Crowd, 71));
    }
}
