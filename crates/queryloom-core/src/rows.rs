//! Canonical result rows and the presentation-normalization pass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metrics::ValueKind;

/// Reporting grain of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGrain {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// One row of the canonical result contract.
///
/// Field names are part of the wire format consumed downstream; renaming
/// any of them is a breaking change. `reporting_currency` is omitted from
/// serialized rows when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRow {
    pub period: NaiveDate,
    pub period_grain: PeriodGrain,
    pub entity_name: String,
    pub metric_name: String,
    pub metric_label: String,
    pub metric_type: ValueKind,
    pub metric_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_currency: Option<String>,
}

/// Rescale percentage metrics reported as ratios.
///
/// Generated SQL returns percentage KPIs sometimes as 0..1 ratios and
/// sometimes already scaled. A percentage row whose value sits within
/// [-1, 1] is treated as a ratio and multiplied by 100; every other row,
/// including all absolute metrics, passes through untouched. Order and
/// count are preserved, and non-finite values compare false and fall
/// through.
pub fn normalize_rows(mut rows: Vec<CanonicalRow>) -> Vec<CanonicalRow> {
    for row in &mut rows {
        if row.metric_type == ValueKind::Percentage && row.metric_value.abs() <= 1.0 {
            row.metric_value *= 100.0;
        }
    }
    rows
}
