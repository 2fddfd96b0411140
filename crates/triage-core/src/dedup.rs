//! Cross-source merging of task records.
//!
//! Identity across trackers is a heuristic: two titles are the same task when
//! their normalized forms are equal, one contains the other as a token
//! sequence, or their token sets overlap (Jaccard) at or above a threshold.

use crate::task::Task;
use std::collections::BTreeSet;

/// One source's tasks, in the priority order the sources were configured.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub tasks: Vec<Task>,
}

/// Lowercase, drop leading `[tag]` prefixes, replace punctuation with spaces
/// and collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    let mut rest = title.trim();
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(end) => rest = stripped[end + 1..].trim_start(),
            None => break,
        }
    }
    rest.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Token Jaccard overlap of two normalized titles, in `[0, 1]`.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = tokens(a).into_iter().collect();
    let tb: BTreeSet<&str> = tokens(b).into_iter().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

fn contains_sequence(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

pub fn same_title(a: &str, b: &str, threshold: f64) -> bool {
    let na = normalize_title(a);
    let nb = normalize_title(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na == nb {
        return true;
    }
    let (ta, tb) = (tokens(&na), tokens(&nb));
    if contains_sequence(&ta, &tb) || contains_sequence(&tb, &ta) {
        return true;
    }
    token_overlap(&na, &nb) >= threshold
}

/// Fold `other` into `canonical`. The canonical record keeps its identity,
/// title and timestamps; labels and assignees are unioned.
fn absorb(canonical: &mut Task, other: &Task) {
    canonical.labels.extend(other.labels.iter().cloned());
    canonical.assignees.extend(other.assignees.iter().cloned());
    if canonical.body.trim().is_empty() && !other.body.trim().is_empty() {
        canonical.body = other.body.clone();
    }
    if canonical.url.is_none() {
        canonical.url = other.url.clone();
    }
    if canonical.linked.is_none() {
        canonical.linked = Some(other.task_ref());
    } else {
        tracing::debug!(
            canonical = %canonical.task_ref(),
            extra = %other.task_ref(),
            "task already linked, extra match folded without reference"
        );
    }
}

/// Merge batches into one list with one record per logical task. Earlier
/// batches win; tasks never merge with tasks from their own source.
pub fn merge_sources(batches: Vec<SourceBatch>, threshold: f64) -> Vec<Task> {
    let mut merged: Vec<(String, Task)> = Vec::new();

    for batch in batches {
        for task in batch.tasks {
            let existing = merged
                .iter_mut()
                .find(|(src, kept)| *src != batch.source && same_title(&kept.title, &task.title, threshold));
            match existing {
                Some((_, kept)) => {
                    tracing::debug!(
                        kept = %kept.task_ref(),
                        merged = %task.task_ref(),
                        "merged duplicate task across sources"
                    );
                    absorb(kept, &task);
                }
                None => merged.push((batch.source.clone(), task)),
            }
        }
    }

    merged.into_iter().map(|(_, t)| t).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
