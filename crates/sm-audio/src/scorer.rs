use sm_core::config::GroupRules;
use sm_core::{Group, GroupTotals, LabelScore};

/// Aggregates per-label scores into weighted group totals.
///
/// A label contributes `score × weight` to every group having a keyword that
/// is a substring of the lowercased label, so one label may feed several groups.
///
/// # Example
/// ```
/// use sm_audio::scorer::GroupScorer;
/// use sm_core::config::GroupRules;
/// use sm_core::{Group, LabelScore};
///
/// let scorer = GroupScorer::new(&GroupRules::default(), 5);
/// let outcome = scorer.score(&[LabelScore::new("Crowd", 0.4), LabelScore::new("Speech", 0.9)]);
/// assert_eq!(outcome.winner, Group::Crowd);
/// ```
pub struct GroupScorer {
    /// Lowercased keywords and weight, indexed by `Group::index`.
    rules: [(Vec<String>, f32); 3],
    top_n: usize,
}

/// Result of scoring one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreOutcome {
    /// Weighted totals, one per group.
    pub totals: GroupTotals,
    /// Group with the largest total, ties broken by `Group::ALL` order.
    pub winner: Group,
    /// Highest individual labels, by descending score.
    pub top: Vec<LabelScore>,
}

impl GroupScorer {
    /// Create a scorer from keyword rules.
    #[must_use]
    pub fn new(rules: &GroupRules, top_n: usize) -> Self {
        let compile = |g: Group| {
            let r = rules.get(g);
            (
                r.keywords.iter().map(|k| k.to_lowercase()).collect(),
                r.weight,
            )
        };
        Self {
            rules: [
                compile(Group::Speech),
                compile(Group::Crowd),
                compile(Group::Silent),
            ],
            top_n,
        }
    }

    /// Score one classification result.
    #[must_use]
    pub fn score(&self, labels: &[LabelScore]) -> ScoreOutcome {
        let totals = self.totals(labels);
        ScoreOutcome {
            totals,
            winner: totals.winner(),
            top: top_labels(labels, self.top_n),
        }
    }

    /// Weighted totals only. Non-finite scores contribute nothing.
    #[must_use]
    pub fn totals(&self, labels: &[LabelScore]) -> GroupTotals {
        let mut totals = GroupTotals::default();
        for item in labels {
            if !item.score.is_finite() {
                continue;
            }
            let label = item.label.to_lowercase();
            for group in Group::ALL {
                let (keywords, weight) = &self.rules[group.index()];
                if keywords.iter().any(|k| label.contains(k.as_str())) {
                    totals.add(group, item.score * weight);
                }
            }
        }
        totals
    }
}

/// The `n` highest labels by descending score; equal scores keep input order.
#[must_use]
pub fn top_labels(labels: &[LabelScore], n: usize) -> Vec<LabelScore> {
    let mut sorted: Vec<&LabelScore> = labels.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
    sorted.into_iter().take(n).cloned().collect()
}
