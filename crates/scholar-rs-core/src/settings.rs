//! Config to runtime policy mapping.

use crate::history::SessionHistory;
use scholar_rs_config::{HistoryConfig, MatchingConfig, RecallConfig, SummaryConfig};
use scholar_rs_memory::{MatchPolicy, RecallPolicy, SummaryPolicy};
use std::time::Duration;

pub(crate) fn match_policy_from_config(config: &MatchingConfig) -> MatchPolicy {
    MatchPolicy {
        prefix_chars: config.prefix_chars,
        overlap_ratio: config.overlap_ratio,
        similarity_threshold: config.similarity_threshold,
    }
}

pub(crate) fn recall_policy_from_config(config: &RecallConfig) -> RecallPolicy {
    RecallPolicy {
        limit: config.limit,
        default_query: config.default_query.clone(),
    }
}

pub(crate) fn summary_policy_from_config(config: &SummaryConfig) -> SummaryPolicy {
    SummaryPolicy {
        enabled: config.enabled,
        message_window: config.message_window,
        every_n_turns: config.every_n_turns,
    }
}

pub(crate) fn history_from_config(config: &HistoryConfig) -> SessionHistory {
    SessionHistory::new(config.capacity, Duration::from_secs(config.ttl_secs))
}
