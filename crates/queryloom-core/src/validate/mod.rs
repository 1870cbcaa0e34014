//! SQL validation: parser-level syntax checks, schema-aware semantic checks
//! against an ephemeral store, and the bounded repair loop that brokers
//! failures to an external collaborator.

pub mod repair;
pub mod semantic;
pub mod syntax;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use repair::{
    validate_and_repair, RepairEngine, RepairOutcome, RepairPolicy, RepairStatus,
};
pub use semantic::{validate_semantics, StoreError};
pub use syntax::validate_syntax;

/// Verdict of a single validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationResult {
    Valid,
    Invalid { message: String },
}

impl ValidationResult {
    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationResult::Invalid {
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Which validator produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStage {
    Syntax,
    Semantic,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStage::Syntax => write!(f, "syntax"),
            ValidationStage::Semantic => write!(f, "semantic"),
        }
    }
}

/// One failed check that was handed to the repair collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationAttempt {
    pub stage: ValidationStage,
    pub error: String,
}

/// Shape of one table visible to the statement under validation.
///
/// These come from the caller's schema description, not from any live
/// database; the semantic validator materializes them into an empty
/// throwaway store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableShape {
    pub table_name: String,
    pub columns: Vec<ColumnShape>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnShape {
    pub name: String,
    /// Loosely-typed source column type, e.g. `"bigint"` or `"numeric(12,2)"`.
    #[serde(rename = "type")]
    pub source_type: String,
}

impl TableShape {
    pub fn new(table_name: &str, columns: &[(&str, &str)]) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: columns
                .iter()
                .map(|(name, source_type)| ColumnShape {
                    name: name.to_string(),
                    source_type: source_type.to_string(),
                })
                .collect(),
        }
    }
}
