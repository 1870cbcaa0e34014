//! Canonical entity dictionary.
//!
//! Built per request from the caller's reference catalog; the reverse index
//! is the single lookup structure the entity resolver consults. Keys are
//! normalized with [`normalize_term`], so construction and lookup cannot
//! drift apart.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_term;

/// One property from the reference catalog.
///
/// `primary_name` is the canonical display name the rest of the pipeline
/// speaks in; the two optional groupings let users refer to a property by
/// who runs it or who owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntity {
    pub primary_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_entity_group: Option<String>,
}

/// What a reverse-index key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReverseKind {
    Primary,
    Operator,
    Legal,
}

/// Reverse-index entry: the primary names a normalized key stands for.
///
/// Primary keys always carry exactly one match (the name itself); grouping
/// keys fan out to every member property, deduplicated, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverseEntry {
    pub kind: ReverseKind,
    pub matches: Vec<String>,
}

/// The canonical dictionary: name universe plus reverse index.
#[derive(Debug, Clone)]
pub struct EntityDictionary {
    names: Vec<String>,
    operator_groups: Vec<String>,
    legal_entity_groups: Vec<String>,
    reverse: HashMap<String, ReverseEntry>,
    /// `(normalized, original)` primary names in sorted order; the fuzzy
    /// scan walks this so ties always break the same way.
    fuzzy_candidates: Vec<(String, String)>,
}

impl EntityDictionary {
    /// Build the dictionary from a reference catalog.
    ///
    /// Two passes: primary names claim their keys first, then operator and
    /// legal-entity groups fan out onto theirs. A group name that collides
    /// with a primary key leaves the primary entry untouched, so the
    /// one-match invariant on primary entries holds unconditionally.
    pub fn build(entities: &[ReferenceEntity]) -> Self {
        let mut names = Vec::new();
        let mut seen_names = HashSet::new();
        let mut reverse: HashMap<String, ReverseEntry> = HashMap::new();

        for entity in entities {
            let key = normalize_term(&entity.primary_name);
            if key.is_empty() {
                continue;
            }
            if seen_names.insert(entity.primary_name.clone()) {
                names.push(entity.primary_name.clone());
            }
            reverse.entry(key).or_insert_with(|| ReverseEntry {
                kind: ReverseKind::Primary,
                matches: vec![entity.primary_name.clone()],
            });
        }

        let mut operator_groups = Vec::new();
        let mut legal_entity_groups = Vec::new();
        let mut seen_operators = HashSet::new();
        let mut seen_legals = HashSet::new();

        for entity in entities {
            if normalize_term(&entity.primary_name).is_empty() {
                continue;
            }
            if let Some(group) = &entity.operator_group {
                index_group(
                    &mut reverse,
                    &mut operator_groups,
                    &mut seen_operators,
                    ReverseKind::Operator,
                    group,
                    &entity.primary_name,
                );
            }
            if let Some(group) = &entity.legal_entity_group {
                index_group(
                    &mut reverse,
                    &mut legal_entity_groups,
                    &mut seen_legals,
                    ReverseKind::Legal,
                    group,
                    &entity.primary_name,
                );
            }
        }

        let mut fuzzy_candidates: Vec<(String, String)> = names
            .iter()
            .map(|name| (normalize_term(name), name.clone()))
            .collect();
        fuzzy_candidates.sort();

        Self {
            names,
            operator_groups,
            legal_entity_groups,
            reverse,
            fuzzy_candidates,
        }
    }

    /// Deduplicated primary names in catalog order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Deduplicated operator group names in catalog order.
    pub fn operator_groups(&self) -> &[String] {
        &self.operator_groups
    }

    /// Deduplicated legal-entity group names in catalog order.
    pub fn legal_entity_groups(&self) -> &[String] {
        &self.legal_entity_groups
    }

    /// Look up a reverse-index entry by its normalized key.
    pub fn entry(&self, normalized_key: &str) -> Option<&ReverseEntry> {
        self.reverse.get(normalized_key)
    }

    /// Number of reverse-index keys.
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    pub(crate) fn fuzzy_candidates(&self) -> &[(String, String)] {
        &self.fuzzy_candidates
    }
}

fn index_group(
    reverse: &mut HashMap<String, ReverseEntry>,
    groups: &mut Vec<String>,
    seen_groups: &mut HashSet<String>,
    kind: ReverseKind,
    group: &str,
    primary_name: &str,
) {
    let key = normalize_term(group);
    if key.is_empty() {
        return;
    }
    if seen_groups.insert(group.to_string()) {
        groups.push(group.to_string());
    }
    let entry = reverse.entry(key).or_insert_with(|| ReverseEntry {
        kind,
        matches: Vec::new(),
    });
    if entry.kind == ReverseKind::Primary {
        return;
    }
    if !entry.matches.iter().any(|m| m == primary_name) {
        entry.matches.push(primary_name.to_string());
    }
}
