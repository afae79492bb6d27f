//! Conversation history shaping.
//!
//! Steps run in a fixed order, each narrowing what the next one scans:
//! window to the newest N, trim to the character budget, drop duplicates,
//! drop incomplete exchanges.

use std::collections::HashSet;

use dirflow_core::context::{Exchange, history_chars};

/// AI replies shorter than this (after trimming) count as incomplete.
pub const MIN_REPLY_CHARS: usize = 3;

/// Keywords in the latest user message that suggest a topic change.
pub const TOPIC_SWITCH_KEYWORDS: [&str; 11] = [
    "新しい", "別の", "違う", "切り替え", "ヘルプ", "使い方", "機能", "change", "switch", "help",
    "new topic",
];

/// Topic-switch detection needs at least this many exchanges.
pub const TOPIC_SWITCH_MIN_HISTORY: usize = 3;

pub fn optimize(history: Vec<Exchange>, max_items: usize, max_chars: usize) -> Vec<Exchange> {
    let windowed = window(history, max_items);
    let bounded = truncate_to_chars(windowed, max_chars);
    let unique = dedup(bounded);
    drop_incomplete(unique)
}

/// Keep the newest `max_items` exchanges, preserving order.
pub fn window(mut history: Vec<Exchange>, max_items: usize) -> Vec<Exchange> {
    if history.len() > max_items {
        history.drain(..history.len() - max_items);
    }
    history
}

/// Keep the longest newest-first suffix that fits in `max_chars`.
pub fn truncate_to_chars(history: Vec<Exchange>, max_chars: usize) -> Vec<Exchange> {
    if history_chars(&history) <= max_chars {
        return history;
    }

    let mut total = 0;
    let mut keep_from = history.len();
    for (i, exchange) in history.iter().enumerate().rev() {
        let len = exchange.char_len();
        if total + len > max_chars {
            break;
        }
        total += len;
        keep_from = i;
    }

    history.into_iter().skip(keep_from).collect()
}

/// Drop exact repeats of a (user, ai) pair, keeping the first.
pub fn dedup(history: Vec<Exchange>) -> Vec<Exchange> {
    let mut seen = HashSet::new();
    history
        .into_iter()
        .filter(|e| seen.insert((e.user.clone(), e.ai_text().to_string())))
        .collect()
}

pub fn drop_incomplete(history: Vec<Exchange>) -> Vec<Exchange> {
    history.into_iter().filter(is_complete).collect()
}

fn is_complete(exchange: &Exchange) -> bool {
    if exchange.user.trim().is_empty() {
        return false;
    }
    match exchange.ai.as_deref() {
        None | Some("") => true,
        Some(ai) => ai.trim().chars().count() >= MIN_REPLY_CHARS,
    }
}

/// Whether the latest user message looks like a change of subject.
pub fn topic_switched(history: &[Exchange]) -> bool {
    if history.len() < TOPIC_SWITCH_MIN_HISTORY {
        return false;
    }
    let Some(last) = history.last() else {
        return false;
    };
    let last = last.user.to_lowercase();
    TOPIC_SWITCH_KEYWORDS.iter().any(|k| last.contains(k))
}
