//! Metric catalog, alias table, and metric resolution.
//!
//! Metric matching is exact-only: the vocabulary is small and two KPIs can
//! sit one edit apart (`arr` / `adr`), so a fuzzy match could silently swap
//! metrics. Misses go to `unknown` instead.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_term;
use crate::resolve::ResolutionOutcome;

/// Whether a metric's values are plain quantities or percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Absolute,
    Percentage,
}

/// One metric from the caller's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    /// Canonical machine name, e.g. `occupancy_pct`.
    pub name: String,
    /// Display label, e.g. `Occupancy %`.
    pub label: String,
    pub value_kind: ValueKind,
}

/// Hand-maintained synonyms for phrases users actually type.
///
/// Keys are pre-normalized; values are canonical metric names. Catalog
/// entries win over this list on collision.
const BUILTIN_SYNONYMS: &[(&str, &str)] = &[
    ("adr", "arr"),
    ("average daily rate", "arr"),
    ("average room rate", "arr"),
    ("occupancy", "occupancy_pct"),
    ("occ", "occupancy_pct"),
    ("occupancy rate", "occupancy_pct"),
    ("revenue per available room", "revpar"),
    ("rev par", "revpar"),
    ("gross operating profit", "gop"),
    ("total revenue", "total_revenue"),
    ("f b revenue", "fnb_revenue"),
];

/// Alias lookup table, rebuilt per request from the caller's catalog.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    /// Index every catalog metric by its normalized name and label, layered
    /// over the built-in synonym list.
    pub fn build(catalog: &[MetricDefinition]) -> Self {
        let mut aliases = HashMap::new();
        for (alias, canonical) in BUILTIN_SYNONYMS {
            aliases.insert((*alias).to_string(), (*canonical).to_string());
        }
        for metric in catalog {
            for alias in [normalize_term(&metric.name), normalize_term(&metric.label)] {
                if alias.is_empty() {
                    continue;
                }
                aliases.insert(alias, metric.name.clone());
            }
        }
        Self { aliases }
    }

    /// Canonical metric name for a raw phrase, if any.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.aliases.get(&normalize_term(raw)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Resolve raw metric phrases to catalog definitions.
///
/// An alias hit whose canonical name is missing from the catalog still
/// resolves, to a synthesized absolute-valued definition, so a stale
/// synonym list degrades softly instead of dropping the metric.
pub fn resolve_metrics(
    raw_terms: &[String],
    aliases: &AliasTable,
    catalog: &[MetricDefinition],
) -> ResolutionOutcome<MetricDefinition> {
    let mut outcome = ResolutionOutcome::default();
    let mut seen = HashSet::new();

    for raw in raw_terms {
        match aliases.lookup(raw) {
            Some(canonical) => {
                if !seen.insert(canonical.to_string()) {
                    continue;
                }
                let definition = catalog
                    .iter()
                    .find(|m| m.name == canonical)
                    .cloned()
                    .unwrap_or_else(|| MetricDefinition {
                        name: canonical.to_string(),
                        label: canonical.to_string(),
                        value_kind: ValueKind::Absolute,
                    });
                outcome.resolved.push(definition);
            }
            None => outcome.unknown.push(raw.clone()),
        }
    }

    outcome
}
