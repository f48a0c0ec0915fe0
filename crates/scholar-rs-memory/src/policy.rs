//! Runtime policies for matching, recall and course summaries.

/// Heuristics used to locate the stored memory for an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPolicy {
    /// Normalized query characters that must appear in a candidate.
    pub prefix_chars: usize,
    /// Share of a normalized string used for the two-way containment test.
    pub overlap_ratio: f32,
    /// Minimum cosine similarity for a vector match.
    pub similarity_threshold: f32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            prefix_chars: 30,
            overlap_ratio: 0.8,
            similarity_threshold: 0.92,
        }
    }
}

/// Recall sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecallPolicy {
    /// Exchange or long-term memories returned next to the course summary.
    pub limit: usize,
    /// Query used when the caller sends an empty one.
    pub default_query: String,
}

impl Default for RecallPolicy {
    fn default() -> Self {
        Self {
            limit: 5,
            default_query: "learning progress and important concepts".to_string(),
        }
    }
}

impl RecallPolicy {
    /// Upper bound of a recall result: the summary plus `limit` memories.
    pub fn max_results(&self) -> usize {
        self.limit.saturating_add(1)
    }

    pub fn effective_query<'a>(&'a self, query: &'a str) -> &'a str {
        if query.trim().is_empty() {
            &self.default_query
        } else {
            query
        }
    }
}

/// Course summary cadence and input window.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPolicy {
    pub enabled: bool,
    /// Most recent course messages fed to the summary prompt.
    pub message_window: usize,
    /// Refresh the summary every N chat turns; 0 disables the cadence.
    pub every_n_turns: usize,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            message_window: 30,
            every_n_turns: 10,
        }
    }
}

impl SummaryPolicy {
    /// Whether the turn that just completed should trigger a refresh.
    pub fn is_due(&self, turn_count: usize) -> bool {
        self.enabled
            && self.every_n_turns > 0
            && turn_count > 0
            && turn_count % self.every_n_turns == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{RecallPolicy, SummaryPolicy};

    #[test]
    fn empty_query_falls_back_to_default() {
        let policy = RecallPolicy::default();
        assert_eq!(policy.effective_query("  "), policy.default_query);
        assert_eq!(policy.effective_query("tuples"), "tuples");
        assert_eq!(policy.max_results(), 6);
    }

    #[test]
    fn summary_cadence_fires_on_multiples() {
        let policy = SummaryPolicy {
            every_n_turns: 3,
            ..SummaryPolicy::default()
        };
        assert!(!policy.is_due(0));
        assert!(!policy.is_due(2));
        assert!(policy.is_due(3));
        assert!(policy.is_due(6));

        let disabled = SummaryPolicy {
            enabled: false,
            ..policy
        };
        assert!(!disabled.is_due(3));
    }
}
