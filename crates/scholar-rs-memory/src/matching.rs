//! Content heuristics for locating a stored exchange.
//!
//! Client-side message text and stored content drift (trimming, line
//! endings, truncation), so matching works on normalized text: whitespace
//! removed and lowercased.

use crate::model::Memory;

/// Strip all whitespace and lowercase.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// First `prefix_chars` characters of the normalized message.
pub fn query_needle(message: &str, prefix_chars: usize) -> String {
    normalize(message).chars().take(prefix_chars).collect()
}

/// Pick the candidate whose normalized content contains the query needle,
/// scored by raw content length.
///
/// Candidates are expected newest first; on equal scores the earlier one wins.
pub fn best_match<'a>(
    candidates: &'a [Memory],
    message: &str,
    prefix_chars: usize,
) -> Option<&'a Memory> {
    let needle = query_needle(message, prefix_chars);
    if needle.is_empty() {
        return None;
    }
    let mut best = None;
    let mut best_score = 0usize;
    for candidate in candidates {
        if !normalize(&candidate.content).contains(&needle) {
            continue;
        }
        let score = candidate.content.len();
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }
    best
}

/// Two-way approximate containment: the leading `ratio` share of either
/// normalized string occurs inside the other.
pub fn approximately_contains(a: &str, b: &str, ratio: f32) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    leading_share_in(&a, &b, ratio) || leading_share_in(&b, &a, ratio)
}

fn leading_share_in(source: &str, target: &str, ratio: f32) -> bool {
    let len = source.chars().count();
    let take = ((len as f32 * ratio).ceil() as usize).clamp(1, len);
    let prefix: String = source.chars().take(take).collect();
    target.contains(&prefix)
}
