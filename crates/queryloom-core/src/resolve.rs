//! Entity resolution against the canonical dictionary.
//!
//! Resolution never fails: every raw term lands in exactly one of the three
//! outcome buckets. Ambiguity is data for the caller to surface, not an
//! error.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dictionary::{EntityDictionary, ReverseKind};
use crate::normalize::{edit_distance_within, normalize_term};

/// Tunables for the entity resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Minimum similarity (`1 - distance / longest`) for a fuzzy hit.
    pub fuzzy_threshold: f64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.78,
        }
    }
}

/// Outcome of resolving a batch of raw terms.
///
/// `resolved` is an ordered set in first-mention order; `ambiguous` holds
/// ready-to-display disambiguation prompts; `unknown` echoes the inputs
/// nothing matched. Every input term is accounted for in exactly one
/// bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome<T> {
    pub resolved: Vec<T>,
    pub ambiguous: Vec<String>,
    pub unknown: Vec<String>,
}

impl<T> ResolutionOutcome<T> {
    /// True when nothing needs user clarification.
    pub fn is_clean(&self) -> bool {
        self.ambiguous.is_empty() && self.unknown.is_empty()
    }
}

impl<T> Default for ResolutionOutcome<T> {
    fn default() -> Self {
        Self {
            resolved: Vec::new(),
            ambiguous: Vec::new(),
            unknown: Vec::new(),
        }
    }
}

/// Resolve raw entity mentions to canonical primary names.
///
/// Per term: exact reverse-index hit first (primary names and
/// single-member groups resolve outright, multi-member groups produce a
/// disambiguation prompt), then a fuzzy scan over every primary name,
/// then `unknown`.
pub fn resolve_entities(
    raw_terms: &[String],
    dictionary: &EntityDictionary,
    options: &ResolverOptions,
) -> ResolutionOutcome<String> {
    let mut outcome = ResolutionOutcome::default();
    let mut seen = HashSet::new();

    for raw in raw_terms {
        let key = normalize_term(raw);
        if key.is_empty() {
            outcome.unknown.push(raw.clone());
            continue;
        }
        match dictionary.entry(&key) {
            Some(entry) if entry.matches.len() == 1 => {
                let name = entry.matches[0].clone();
                if seen.insert(name.clone()) {
                    outcome.resolved.push(name);
                }
            }
            Some(entry) => {
                outcome
                    .ambiguous
                    .push(disambiguation_prompt(raw, entry.kind, &entry.matches));
            }
            None => match fuzzy_best_match(&key, dictionary, options.fuzzy_threshold) {
                Some(name) => {
                    if seen.insert(name.to_string()) {
                        outcome.resolved.push(name.to_string());
                    }
                }
                None => outcome.unknown.push(raw.clone()),
            },
        }
    }

    outcome
}

fn disambiguation_prompt(raw: &str, kind: ReverseKind, matches: &[String]) -> String {
    let kind_label = match kind {
        ReverseKind::Primary => "name",
        ReverseKind::Operator => "operator group",
        ReverseKind::Legal => "legal entity group",
    };
    format!(
        "\"{}\" is ambiguous: the {} covers {} properties ({}). Please specify which one you mean.",
        raw,
        kind_label,
        matches.len(),
        matches.join(", ")
    )
}

/// Best fuzzy candidate at or above `threshold`, or `None`.
///
/// Candidates are walked in sorted order and only a strictly better score
/// displaces the current best, so equal-scoring names always resolve to the
/// lexicographically first one.
fn fuzzy_best_match<'a>(
    key: &str,
    dictionary: &'a EntityDictionary,
    threshold: f64,
) -> Option<&'a str> {
    let key_chars: Vec<char> = key.chars().collect();
    let mut best: Option<(&str, f64)> = None;

    for (normalized, original) in dictionary.fuzzy_candidates() {
        let longest = normalized.chars().count().max(key_chars.len());
        let allowed = ((1.0 - threshold) * longest as f64).floor() as usize;
        let distance = edit_distance_within(normalized, &key_chars, allowed);
        if distance > allowed {
            continue;
        }
        let score = 1.0 - distance as f64 / longest as f64;
        if score >= threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((original.as_str(), score));
        }
    }

    best.map(|(name, _)| name)
}
