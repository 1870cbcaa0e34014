//! Queryloom CLI
//!
//! Command-line surface over the resolution + validation pipeline:
//! - Resolving question terms against an entity reference file
//! - Resolving metric terms against a metric catalog
//! - Checking candidate SQL (syntax + semantics) against table shapes
//! - Running the bounded repair loop with a configured repair engine
//! - Normalizing result rows into the canonical wire shape

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use queryloom_core::{
    create_engine, normalize_rows, resolve_entities, resolve_metrics, validate_and_repair,
    validate_semantics, validate_syntax, AliasTable, CanonicalRow, EntityDictionary,
    MetricDefinition, ReferenceEntity, RepairPolicy, RepairStatus, ResolverOptions, TableShape,
    ValidationResult,
};

#[derive(Parser)]
#[command(name = "queryloom")]
#[command(
    author,
    version,
    about = "Queryloom: intent resolution and SQL validation pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve entity terms against a reference file.
    Resolve {
        /// Entity reference JSON (array of primaryName/operatorGroup/legalEntityGroup records)
        #[arg(short, long)]
        reference: PathBuf,
        /// Minimum fuzzy-match score, 0.0–1.0
        #[arg(long)]
        threshold: Option<f64>,
        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
        /// Terms to resolve
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Resolve metric terms against a metric catalog.
    Metrics {
        /// Metric catalog JSON (array of name/label/valueKind records)
        #[arg(short, long)]
        catalog: PathBuf,
        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
        /// Terms to resolve
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Check one SQL statement (syntax + semantics) against table shapes.
    Check {
        /// Input SQL file. Use `-` to read from stdin.
        sql: PathBuf,
        /// Table shapes JSON (array of tableName/columns records)
        #[arg(short, long)]
        schema: PathBuf,
        /// Emit the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate one SQL statement, asking a repair engine to fix failures.
    Repair {
        /// Input SQL file. Use `-` to read from stdin.
        sql: PathBuf,
        /// Table shapes JSON (array of tableName/columns records)
        #[arg(short, long)]
        schema: PathBuf,
        /// Repair engine: `mock`, or `http` (requires the repair-http build)
        #[arg(long, default_value = "mock")]
        engine: String,
        /// Chat-completions base URL (http engine)
        #[arg(long)]
        endpoint: Option<String>,
        /// Model name (http engine)
        #[arg(long)]
        model: Option<String>,
        /// Environment variable holding the API key (http engine)
        #[arg(long)]
        api_key_env: Option<String>,
        /// Scripted reply (mock engine)
        #[arg(long)]
        response: Option<String>,
        /// Repair round-trips before giving up
        #[arg(long, default_value_t = 2)]
        max_repairs: usize,
        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize result rows into the canonical wire shape.
    NormalizeRows {
        /// Rows JSON (array of canonical rows). Use `-` to read from stdin.
        rows: PathBuf,
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve {
            reference,
            threshold,
            json,
            terms,
        } => cmd_resolve(&reference, threshold, json, &terms),
        Commands::Metrics {
            catalog,
            json,
            terms,
        } => cmd_metrics(&catalog, json, &terms),
        Commands::Check { sql, schema, json } => cmd_check(&sql, &schema, json),
        Commands::Repair {
            sql,
            schema,
            engine,
            endpoint,
            model,
            api_key_env,
            response,
            max_repairs,
            json,
        } => cmd_repair(
            &sql,
            &schema,
            &engine,
            endpoint,
            model,
            api_key_env,
            response,
            max_repairs,
            json,
        ),
        Commands::NormalizeRows { rows, out } => cmd_normalize_rows(&rows, out.as_ref()),
    }
}

// ============================================================================
// Input loading
// ============================================================================

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn describe_input(path: &Path) -> String {
    if path.as_os_str() == "-" {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}

fn load_reference(path: &Path) -> Result<Vec<ReferenceEntity>> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow!("invalid entity reference JSON at {}: {e}", path.display()))
}

fn load_catalog(path: &Path) -> Result<Vec<MetricDefinition>> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow!("invalid metric catalog JSON at {}: {e}", path.display()))
}

fn load_shapes(path: &Path) -> Result<Vec<TableShape>> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow!("invalid table shapes JSON at {}: {e}", path.display()))
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_resolve(
    reference: &Path,
    threshold: Option<f64>,
    json: bool,
    terms: &[String],
) -> Result<()> {
    let entities = load_reference(reference)?;
    let dictionary = EntityDictionary::build(&entities);

    let mut options = ResolverOptions::default();
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "--threshold must be between 0.0 and 1.0, got {threshold}"
            ));
        }
        options.fuzzy_threshold = threshold;
    }

    let outcome = resolve_entities(terms, &dictionary, &options);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "{} {} term(s) against {} reference entities",
        "Resolving".green().bold(),
        terms.len(),
        dictionary.names().len()
    );
    for name in &outcome.resolved {
        println!("  {} {}", "→".cyan(), name);
    }
    for prompt in &outcome.ambiguous {
        println!("  {} {}", "→".yellow(), prompt);
    }
    for term in &outcome.unknown {
        println!("  {} unknown: {}", "→".red(), term);
    }
    if outcome.is_clean() {
        println!("{}", "All terms resolved.".green());
    }
    Ok(())
}

fn cmd_metrics(catalog_path: &Path, json: bool, terms: &[String]) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let aliases = AliasTable::build(&catalog);

    let outcome = resolve_metrics(terms, &aliases, &catalog);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "{} {} term(s) against {} aliases",
        "Resolving".green().bold(),
        terms.len(),
        aliases.len()
    );
    for metric in &outcome.resolved {
        println!("  {} {} ({})", "→".cyan(), metric.name, metric.label);
    }
    for term in &outcome.unknown {
        println!("  {} unknown: {}", "→".red(), term);
    }
    if outcome.is_clean() {
        println!("{}", "All terms resolved.".green());
    }
    Ok(())
}

fn cmd_check(sql_path: &Path, schema: &Path, json: bool) -> Result<()> {
    let shapes = load_shapes(schema)?;
    let sql = read_input(sql_path)?;

    if !json {
        println!(
            "{} {} against {} table shape(s)",
            "Checking".green().bold(),
            describe_input(sql_path),
            shapes.len()
        );
    }

    if let ValidationResult::Invalid { message } = validate_syntax(&sql) {
        if json {
            let verdict = serde_json::json!({
                "valid": false,
                "stage": "syntax",
                "error": message,
            });
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        } else {
            println!("  {} syntax: {}", "→".red(), message);
        }
        return Err(anyhow!("syntax validation failed"));
    }

    if let ValidationResult::Invalid { message } = validate_semantics(&sql, &shapes)? {
        if json {
            let verdict = serde_json::json!({
                "valid": false,
                "stage": "semantic",
                "error": message,
            });
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        } else {
            println!("  {} semantic: {}", "→".red(), message);
        }
        return Err(anyhow!("semantic validation failed"));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "valid": true }))?);
    } else {
        println!("{}", "Valid.".green());
    }
    Ok(())
}

fn cmd_repair(
    sql_path: &Path,
    schema: &Path,
    engine_kind: &str,
    endpoint: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    response: Option<String>,
    max_repairs: usize,
    json: bool,
) -> Result<()> {
    let shapes = load_shapes(schema)?;
    let sql = read_input(sql_path)?;

    let mut config = HashMap::new();
    if let Some(endpoint) = endpoint {
        config.insert("endpoint".to_string(), endpoint);
    }
    if let Some(model) = model {
        config.insert("model".to_string(), model);
    }
    if let Some(var) = api_key_env {
        let key =
            std::env::var(&var).map_err(|_| anyhow!("environment variable {var} is not set"))?;
        config.insert("api_key".to_string(), key);
    }
    if let Some(response) = response {
        config.insert("response".to_string(), response);
    }
    let engine = create_engine(engine_kind, &config)?;
    let policy = RepairPolicy { max_repairs };

    if !json {
        println!(
            "{} {} with the {} engine (budget {})",
            "Repairing".green().bold(),
            describe_input(sql_path),
            engine.name(),
            policy.max_repairs
        );
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;
    let outcome =
        rt.block_on(async { validate_and_repair(&sql, &shapes, engine.as_ref(), &policy).await })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for attempt in &outcome.attempts {
            println!("  {} {} failed: {}", "→".yellow(), attempt.stage, attempt.error);
        }
        match outcome.status {
            RepairStatus::Valid => {
                println!("{}", "Valid.".green());
                println!("{}", outcome.final_sql);
            }
            RepairStatus::Exhausted => {
                println!("{}", "Repair budget exhausted.".red());
                println!("{}", outcome.final_sql);
            }
        }
    }

    match outcome.status {
        RepairStatus::Valid => Ok(()),
        RepairStatus::Exhausted => Err(anyhow!(
            "SQL still failing after {} repair attempt(s)",
            outcome.attempts.len()
        )),
    }
}

fn cmd_normalize_rows(rows_path: &Path, out: Option<&PathBuf>) -> Result<()> {
    let text = read_input(rows_path)?;
    let rows: Vec<CanonicalRow> = serde_json::from_str(&text)
        .map_err(|e| anyhow!("invalid rows JSON at {}: {e}", describe_input(rows_path)))?;

    let normalized = normalize_rows(rows);
    let rendered = serde_json::to_string_pretty(&normalized)?;
    match out {
        Some(path) => {
            fs::write(path, &rendered)?;
            println!(
                "{} {} row(s)",
                "Normalized".green().bold(),
                normalized.len()
            );
            println!("  {} {}", "→".cyan(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const REFERENCE_JSON: &str = r#"[
        {"primaryName": "Hotel A", "operatorGroup": "Acme"},
        {"primaryName": "Hotel B", "operatorGroup": "Acme"}
    ]"#;

    const SHAPES_JSON: &str = r#"[
        {"tableName": "daily_kpis", "columns": [
            {"name": "entity_name", "type": "text"},
            {"name": "metric_value", "type": "numeric"}
        ]}
    ]"#;

    #[test]
    fn reference_files_parse_with_wire_field_names() {
        let file = write_temp(REFERENCE_JSON);
        let entities = load_reference(file.path()).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].primary_name, "Hotel A");
        assert_eq!(entities[0].operator_group.as_deref(), Some("Acme"));
        assert_eq!(entities[0].legal_entity_group, None);
    }

    #[test]
    fn shape_files_parse_with_wire_field_names() {
        let file = write_temp(SHAPES_JSON);
        let shapes = load_shapes(file.path()).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].table_name, "daily_kpis");
        assert_eq!(shapes[0].columns[1].source_type, "numeric");
    }

    #[test]
    fn malformed_reference_files_are_rejected_with_the_path() {
        let file = write_temp("{ not json");
        let err = load_reference(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid entity reference JSON"));
    }

    #[test]
    fn resolve_rejects_thresholds_outside_the_unit_interval() {
        let file = write_temp(REFERENCE_JSON);
        let err = cmd_resolve(
            file.path(),
            Some(1.5),
            false,
            &["Hotel A".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("--threshold"));
    }

    #[test]
    fn check_passes_valid_sql_and_fails_broken_sql() {
        let schema = write_temp(SHAPES_JSON);
        let good = write_temp("SELECT entity_name FROM daily_kpis");
        assert!(cmd_check(good.path(), schema.path(), false).is_ok());

        let bad = write_temp("SELEC entity_name FORM daily_kpis");
        let err = cmd_check(bad.path(), schema.path(), false).unwrap_err();
        assert!(err.to_string().contains("syntax"));

        let wrong_column = write_temp("SELECT no_such_column FROM daily_kpis");
        let err = cmd_check(wrong_column.path(), schema.path(), false).unwrap_err();
        assert!(err.to_string().contains("semantic"));
    }

    #[test]
    fn repair_with_a_scripted_mock_reaches_valid() {
        let schema = write_temp(SHAPES_JSON);
        let sql = write_temp("SELEC entity_name FORM daily_kpis");
        let result = cmd_repair(
            sql.path(),
            schema.path(),
            "mock",
            None,
            None,
            None,
            Some("SELECT entity_name FROM daily_kpis".to_string()),
            2,
            false,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn normalize_rows_writes_scaled_output() {
        let rows = write_temp(
            r#"[{
                "period": "2024-03-31",
                "periodGrain": "month",
                "entityName": "Hotel A",
                "metricName": "occupancy_pct",
                "metricLabel": "Occupancy %",
                "metricType": "percentage",
                "metricValue": 0.42
            }]"#,
        );
        let out = tempfile::NamedTempFile::new().unwrap();
        cmd_normalize_rows(rows.path(), Some(&out.path().to_path_buf())).unwrap();

        let written = fs::read_to_string(out.path()).unwrap();
        let parsed: Vec<CanonicalRow> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed[0].metric_value, 42.0);
    }
}
