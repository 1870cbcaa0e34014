//! End-to-end tests for the resolution + validation pipeline:
//! 1. Question terms → resolved entities and metrics
//! 2. Ambiguity and unknown handling as data
//! 3. Candidate SQL → syntax + semantic validation
//! 4. Bounded repair with a scripted collaborator
//! 5. Result rows → canonical normalized rows

use chrono::NaiveDate;
use queryloom_core::*;

// ============================================================================
// Fixtures
// ============================================================================

fn reference() -> Vec<ReferenceEntity> {
    let entity = |name: &str, operator: Option<&str>, legal: Option<&str>| ReferenceEntity {
        primary_name: name.to_string(),
        operator_group: operator.map(str::to_string),
        legal_entity_group: legal.map(str::to_string),
    };
    vec![
        entity("Hotel A", Some("Acme"), Some("Acme Holdings BV")),
        entity("Hotel B", Some("Acme"), Some("Acme Holdings BV")),
        entity("Hotel Alpha", Some("Borealis"), None),
        entity("Grand Pier Resort", None, Some("Pier Estates Ltd")),
    ]
}

fn metric_catalog() -> Vec<MetricDefinition> {
    vec![
        MetricDefinition {
            name: "arr".to_string(),
            label: "Average Room Rate".to_string(),
            value_kind: ValueKind::Absolute,
        },
        MetricDefinition {
            name: "occupancy_pct".to_string(),
            label: "Occupancy %".to_string(),
            value_kind: ValueKind::Percentage,
        },
    ]
}

fn table_shapes() -> Vec<TableShape> {
    vec![
        TableShape::new(
            "daily_kpis",
            &[
                ("entity_name", "text"),
                ("period", "date"),
                ("metric_name", "varchar(64)"),
                ("metric_value", "numeric(12,2)"),
            ],
        ),
        TableShape::new("entities", &[("name", "text"), ("operator", "text")]),
    ]
}

fn terms(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| t.to_string()).collect()
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn question_terms_resolve_into_structured_intent() {
    let dictionary = EntityDictionary::build(&reference());
    let aliases = AliasTable::build(&metric_catalog());

    let entities = resolve_entities(
        &terms(&["hotel alpha", "Pier Estates Ltd"]),
        &dictionary,
        &ResolverOptions::default(),
    );
    assert_eq!(entities.resolved, vec!["Hotel Alpha", "Grand Pier Resort"]);
    assert!(entities.is_clean());

    let metrics = resolve_metrics(&terms(&["ADR", "occupancy"]), &aliases, &metric_catalog());
    let names: Vec<&str> = metrics.resolved.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["arr", "occupancy_pct"]);
    assert!(metrics.is_clean());
}

#[test]
fn ambiguity_and_unknowns_come_back_as_data() {
    let dictionary = EntityDictionary::build(&reference());
    let outcome = resolve_entities(
        &terms(&["Acme", "hotl alpha", "zzz totally different"]),
        &dictionary,
        &ResolverOptions::default(),
    );

    assert_eq!(outcome.resolved, vec!["Hotel Alpha"]);
    assert_eq!(outcome.unknown, vec!["zzz totally different"]);
    assert_eq!(outcome.ambiguous.len(), 1);
    assert!(outcome.ambiguous[0].contains("Hotel A"));
    assert!(outcome.ambiguous[0].contains("Hotel B"));
}

#[test]
fn dictionaries_are_rebuilt_per_request() {
    let full = EntityDictionary::build(&reference());
    assert_eq!(full.entry("acme").unwrap().matches.len(), 2);

    // Same group, smaller catalog: the new dictionary must not remember
    // the earlier membership.
    let trimmed: Vec<ReferenceEntity> = reference()
        .into_iter()
        .filter(|e| e.primary_name != "Hotel B")
        .collect();
    let rebuilt = EntityDictionary::build(&trimmed);
    assert_eq!(rebuilt.entry("acme").unwrap().matches, vec!["Hotel A"]);

    let outcome = resolve_entities(
        &terms(&["Acme"]),
        &rebuilt,
        &ResolverOptions::default(),
    );
    assert_eq!(outcome.resolved, vec!["Hotel A"]);
    assert!(outcome.ambiguous.is_empty());
}

#[test]
fn resolution_outcome_serializes_with_stable_fields() {
    let dictionary = EntityDictionary::build(&reference());
    let outcome = resolve_entities(
        &terms(&["Hotel A", "Acme", "nonsense"]),
        &dictionary,
        &ResolverOptions::default(),
    );
    let value = serde_json::to_value(&outcome).unwrap();
    let object = value.as_object().unwrap();
    assert!(object.contains_key("resolved"));
    assert!(object.contains_key("ambiguous"));
    assert!(object.contains_key("unknown"));
}

// ============================================================================
// Validation + repair
// ============================================================================

#[tokio::test]
async fn typoed_candidate_is_repaired_then_validated_end_to_end() {
    let engine = MockRepairEngine::always(
        "SELECT entity_name, metric_value FROM daily_kpis WHERE period >= '2024-01-01'",
    );
    let outcome = validate_and_repair(
        "SELEC entity_name, metric_value FORM daily_kpis",
        &table_shapes(),
        &engine,
        &RepairPolicy::default(),
    )
    .await
    .unwrap();

    assert!(outcome.is_valid());
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.attempts[0].stage, ValidationStage::Syntax);
    assert!(outcome.final_sql.contains("FROM daily_kpis"));
}

#[tokio::test]
async fn exhaustion_surfaces_the_full_attempt_history() {
    let engine = MockRepairEngine::new(vec![
        "SELECT wrong_column FROM daily_kpis".to_string(),
        "SELECT also_wrong FROM daily_kpis".to_string(),
    ]);
    let outcome = validate_and_repair(
        "not sql at all",
        &table_shapes(),
        &engine,
        &RepairPolicy::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.status, RepairStatus::Exhausted);
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[0].stage, ValidationStage::Syntax);
    assert_eq!(outcome.attempts[1].stage, ValidationStage::Semantic);
    assert_eq!(outcome.final_sql, "SELECT also_wrong FROM daily_kpis");
}

#[tokio::test]
async fn complex_sql_validates_against_described_shapes_without_repair() {
    let sql = "WITH ranked AS (
                   SELECT entity_name,
                          metric_value,
                          ROW_NUMBER() OVER (ORDER BY metric_value DESC) AS rn
                   FROM daily_kpis
                   WHERE metric_name = 'occupancy_pct'
               )
               SELECT r.entity_name, r.metric_value, e.operator
               FROM ranked r
               JOIN entities e ON e.name = r.entity_name
               WHERE r.rn <= 10";
    let engine = MockRepairEngine::always("SELECT 1");
    let outcome = validate_and_repair(sql, &table_shapes(), &engine, &RepairPolicy::default())
        .await
        .unwrap();
    assert!(outcome.is_valid());
    assert!(outcome.attempts.is_empty());
}

// ============================================================================
// Row normalization
// ============================================================================

#[test]
fn result_rows_come_out_canonical() {
    let row = |metric: &MetricDefinition, value: f64| CanonicalRow {
        period: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        period_grain: PeriodGrain::Month,
        entity_name: "Hotel Alpha".to_string(),
        metric_name: metric.name.clone(),
        metric_label: metric.label.clone(),
        metric_type: metric.value_kind,
        metric_value: value,
        reporting_currency: Some("EUR".to_string()),
    };

    let catalog = metric_catalog();
    let rows = normalize_rows(vec![row(&catalog[0], 184.2), row(&catalog[1], 0.87)]);

    assert_eq!(rows[0].metric_value, 184.2);
    assert_eq!(rows[1].metric_value, 87.0);

    let json = serde_json::to_string(&rows[1]).unwrap();
    assert!(json.contains("\"metricType\":\"percentage\""));
    assert!(json.contains("\"reportingCurrency\":\"EUR\""));
}
