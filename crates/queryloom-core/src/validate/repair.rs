//! Bounded validate → repair → re-validate orchestration.
//!
//! The loop owns candidate lifecycle only; producing SQL and fixing SQL are
//! both somebody else's job. Every candidate, including everything the
//! repair collaborator returns, goes back through syntax first and then
//! semantics, and the whole exchange is capped by [`RepairPolicy`] so a
//! stubborn statement can never spin.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::semantic::{validate_semantics, StoreError};
use super::syntax::validate_syntax;
use super::{TableShape, ValidationAttempt, ValidationResult, ValidationStage};

/// External collaborator that proposes a replacement for failing SQL.
///
/// Implementations are LLM-backed in production and scripted in tests. The
/// loop treats whatever they return as untrusted input and re-validates it
/// from scratch.
#[async_trait]
pub trait RepairEngine: Send + Sync {
    async fn repair(
        &self,
        sql: &str,
        stage: ValidationStage,
        error: &str,
        tables: &[TableShape],
    ) -> anyhow::Result<String>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Bounds for the repair loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairPolicy {
    /// Maximum repair round-trips before giving up on a candidate.
    pub max_repairs: usize,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self { max_repairs: 2 }
    }
}

/// Terminal state of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairStatus {
    Valid,
    Exhausted,
}

/// Final candidate plus every failure that was sent out for repair.
///
/// On exhaustion the last candidate comes back as-is together with the
/// attempt log; callers decide whether a still-failing statement is worth
/// surfacing. Nothing is ever discarded silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub final_sql: String,
    pub attempts: Vec<ValidationAttempt>,
    pub status: RepairStatus,
}

impl RepairOutcome {
    pub fn is_valid(&self) -> bool {
        self.status == RepairStatus::Valid
    }
}

fn check_candidate(
    sql: &str,
    tables: &[TableShape],
) -> Result<Option<(ValidationStage, String)>, StoreError> {
    if let ValidationResult::Invalid { message } = validate_syntax(sql) {
        return Ok(Some((ValidationStage::Syntax, message)));
    }
    if let ValidationResult::Invalid { message } = validate_semantics(sql, tables)? {
        return Ok(Some((ValidationStage::Semantic, message)));
    }
    Ok(None)
}

/// Run the full check-and-repair loop over one candidate statement.
///
/// Each round: syntax, then semantics against a fresh ephemeral store. A
/// failure within budget is appended to the attempt log and handed to the
/// engine; the returned SQL becomes the next candidate. When the budget is
/// spent and the candidate still fails, the loop stops with
/// [`RepairStatus::Exhausted`]. A collaborator error also stops the loop
/// early, keeping the current candidate; only losing the ephemeral store
/// escapes as `Err`.
pub async fn validate_and_repair(
    sql: &str,
    tables: &[TableShape],
    engine: &dyn RepairEngine,
    policy: &RepairPolicy,
) -> Result<RepairOutcome, StoreError> {
    let mut candidate = sql.to_string();
    let mut attempts: Vec<ValidationAttempt> = Vec::new();

    for round in 0..=policy.max_repairs {
        let (stage, error) = match check_candidate(&candidate, tables)? {
            None => {
                return Ok(RepairOutcome {
                    final_sql: candidate,
                    attempts,
                    status: RepairStatus::Valid,
                });
            }
            Some(failure) => failure,
        };

        if round == policy.max_repairs {
            info!(
                attempts = attempts.len(),
                %stage,
                "repair budget exhausted, returning last candidate"
            );
            break;
        }

        info!(
            round = round + 1,
            %stage,
            error = %error,
            engine = engine.name(),
            "requesting SQL repair"
        );
        match engine.repair(&candidate, stage, &error, tables).await {
            Ok(repaired) => {
                attempts.push(ValidationAttempt { stage, error });
                candidate = repaired;
            }
            Err(err) => {
                warn!(
                    error = %err,
                    engine = engine.name(),
                    "repair engine failed, keeping current candidate"
                );
                attempts.push(ValidationAttempt { stage, error });
                break;
            }
        }
    }

    Ok(RepairOutcome {
        final_sql: candidate,
        attempts,
        status: RepairStatus::Exhausted,
    })
}
