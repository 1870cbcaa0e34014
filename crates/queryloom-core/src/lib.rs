//! Queryloom Core: Intent Resolution & SQL Validation Pipeline
//!
//! Sits between a natural-language question and a SQL execution engine.
//! On the way in, vague entity and metric mentions are resolved against
//! caller-supplied catalogs; on the way out, candidate SQL is validated at
//! the parser level and against the described schema, with failures
//! brokered to an external repair collaborator a bounded number of times.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                  INTENT → VALIDATED SQL PIPELINE                   │
//! ├────────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │  entity mentions ──► EntityDictionary ──► resolved / ambiguous /   │
//! │                      (reverse index,      unknown                  │
//! │                       fuzzy fallback)                              │
//! │                                                                    │
//! │  metric phrases ───► AliasTable ────────► catalog definitions      │
//! │                      (exact only)         (or synthesized)         │
//! │                                                                    │
//! │  candidate SQL ────► syntax check ──fail──┐                        │
//! │                          │                │                        │
//! │                      semantic check   RepairEngine (LLM / mock)    │
//! │                      (ephemeral,          │                        │
//! │                       empty SQLite)  ◄─retry, bounded              │
//! │                          │                                         │
//! │                      valid SQL (or exhausted + attempt log)        │
//! │                                                                    │
//! │  result rows ──────► normalize_rows ────► canonical rows           │
//! │                      (percentage rescale)                          │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Design rules the whole crate follows:
//!
//! - Resolution never throws for bad input. Ambiguity and unknown terms
//!   are data in the [`ResolutionOutcome`], never errors.
//! - All state is per-call. Dictionaries and alias tables are rebuilt from
//!   the caller's catalogs on every request; the semantic store lives for
//!   one check. Nothing is cached across requests.
//! - The only hard failure is losing the ephemeral validation store
//!   ([`StoreError`]); everything a statement did wrong is a verdict.
//! - The repair collaborator is injected and untrusted: whatever it
//!   returns is re-validated from syntax onward.

pub mod dictionary;
pub mod metrics;
pub mod normalize;
pub mod providers;
pub mod resolve;
pub mod rows;
pub mod validate;

pub use dictionary::{EntityDictionary, ReferenceEntity, ReverseEntry, ReverseKind};
pub use metrics::{resolve_metrics, AliasTable, MetricDefinition, ValueKind};
pub use normalize::normalize_term;
#[cfg(feature = "http")]
pub use providers::HttpRepairEngine;
pub use providers::{create_engine, MockRepairEngine};
pub use resolve::{resolve_entities, ResolutionOutcome, ResolverOptions};
pub use rows::{normalize_rows, CanonicalRow, PeriodGrain};
pub use validate::{
    validate_and_repair, validate_semantics, validate_syntax, ColumnShape, RepairEngine,
    RepairOutcome, RepairPolicy, RepairStatus, StoreError, TableShape, ValidationAttempt,
    ValidationResult, ValidationStage,
};
