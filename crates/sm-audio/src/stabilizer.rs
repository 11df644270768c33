use std::collections::VecDeque;

use sm_core::Group;

/// Majority vote over the last K raw statuses.
///
/// Ties go to the value seen earliest in the history (oldest first).
///
/// # Example
/// ```
/// use sm_audio::stabilizer::StatusStabilizer;
/// use sm_core::Group;
///
/// let mut s = StatusStabilizer::new(3);
/// s.update(Group::Crowd);
/// s.update(Group::Crowd);
/// assert_eq!(s.update(Group::Speech), Group::Crowd);
/// ```
pub struct StatusStabilizer {
    history: VecDeque<Group>,
    capacity: usize,
    current: Group,
}

impl StatusStabilizer {
    /// Create a stabilizer holding at most `capacity` raw statuses.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            current: Group::Silent,
        }
    }

    /// Record a raw status and return the stabilized one.
    pub fn update(&mut self, raw: Group) -> Group {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(raw);
        self.current = majority(&self.history);
        self.current
    }

    /// Last stabilized status (`Silent` before any update).
    #[must_use]
    pub fn current(&self) -> Group {
        self.current
    }

    /// Raw statuses, oldest first.
    pub fn history(&self) -> impl Iterator<Item = Group> + '_ {
        self.history.iter().copied()
    }
}

/// Most frequent value; the earliest entry wins among equal counts.
fn majority(history: &VecDeque<Group>) -> Group {
    let mut counts = [0usize; 3];
    for g in history {
        counts[g.index()] += 1;
    }
    let max = counts.iter().copied().max().unwrap_or(0);
    history
        .iter()
        .copied()
        .find(|g| counts[g.index()] == max)
        .unwrap_or_default()
}
