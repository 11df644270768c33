use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic group a classification cycle is reduced to.
///
/// Declaration order is the tie-break priority: `Speech` > `Crowd` > `Silent`.
///
/// # Example
/// ```
/// use sm_core::group::Group;
/// assert_eq!(Group::default(), Group::Silent);
/// assert_eq!(Group::Crowd.as_str(), "crowd");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Spoken voice, conversation.
    Speech,
    /// Crowd noise, cheering.
    Crowd,
    /// Silence or ambient background.
    #[default]
    Silent,
}

impl Group {
    /// All groups, in tie-break priority order.
    pub const ALL: [Group; 3] = [Group::Speech, Group::Crowd, Group::Silent];

    /// Lowercase name used in logs and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Group::Speech => "speech",
            Group::Crowd => "crowd",
            Group::Silent => "silent",
        }
    }

    /// Position in [`Group::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Group::Speech => 0,
            Group::Crowd => 1,
            Group::Silent => 2,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted score accumulated per group for one cycle.
///
/// Always holds a value for every group (zero when nothing matched).
///
/// # Example
/// ```
/// use sm_core::group::{Group, GroupTotals};
/// let mut totals = GroupTotals::default();
/// totals.add(Group::Crowd, 2.5);
/// assert_eq!(totals.winner(), Group::Crowd);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GroupTotals {
    pub speech: f32,
    pub crowd: f32,
    pub silent: f32,
}

impl GroupTotals {
    /// Total for `group`.
    #[must_use]
    pub fn get(&self, group: Group) -> f32 {
        match group {
            Group::Speech => self.speech,
            Group::Crowd => self.crowd,
            Group::Silent => self.silent,
        }
    }

    /// Add `value` to the total of `group`.
    pub fn add(&mut self, group: Group, value: f32) {
        match group {
            Group::Speech => self.speech += value,
            Group::Crowd => self.crowd += value,
            Group::Silent => self.silent += value,
        }
    }

    /// Iterate `(group, total)` in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Group, f32)> + '_ {
        Group::ALL.into_iter().map(move |g| (g, self.get(g)))
    }

    /// Group with the largest total.
    ///
    /// Ties go to the group declared first in [`Group::ALL`].
    #[must_use]
    pub fn winner(&self) -> Group {
        let mut best = Group::ALL[0];
        let mut best_total = self.get(best);
        for (group, total) in self.iter().skip(1) {
            if total > best_total {
                best = group;
                best_total = total;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_resolves_to_speech() {
        assert_eq!(GroupTotals::default().winner(), Group::Speech);
    }

    #[test]
    fn ties_follow_priority_order() {
        let totals = GroupTotals {
            speech: 0.5,
            crowd: 0.5,
            silent: 0.5,
        };
        assert_eq!(totals.winner(), Group::Speech);

        let totals = GroupTotals {
            speech: 0.1,
            crowd: 0.7,
            silent: 0.7,
        };
        assert_eq!(totals.winner(), Group::Crowd);
    }

    #[test]
    fn strict_maximum_wins() {
        let totals = GroupTotals {
            speech: 0.2,
            crowd: 0.1,
            silent: 0.3,
        };
        assert_eq!(totals.winner(), Group::Silent);
    }

    #[test]
    fn serializes_lowercase_names() {
        let v = toml::Value::try_from(Group::Crowd);
        assert!(matches!(v, Ok(toml::Value::String(ref s)) if s == "crowd"));
    }
}
