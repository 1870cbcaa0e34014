//! Schema-aware semantic validation against an ephemeral store.
//!
//! Each call materializes the described tables into a private in-memory
//! SQLite database, asks the engine to plan the statement, and throws the
//! database away. Nothing persists between calls and no rows are ever
//! inserted: the store exists purely so that name resolution and type
//! checks run with the engine's own rules.

use rusqlite::Connection;

use super::{TableShape, ValidationResult};

/// The ephemeral store could not be created.
///
/// Fatal for the call: distinct from a semantic failure of the statement,
/// propagated to the caller, never silently retried.
#[derive(Debug, thiserror::Error)]
#[error("semantic validation store unavailable: {0}")]
pub struct StoreError(#[from] rusqlite::Error);

/// Map a loosely-typed source column type onto a storage class.
///
/// Matching is by case-insensitive substring because upstream schema
/// descriptions carry free-form strings like `"bigint"`, `"numeric(12,2)"`,
/// or `"Date"`. Dates land on TEXT: period columns are compared as
/// ISO-8601 strings.
pub fn map_column_type(source_type: &str) -> &'static str {
    let lowered = source_type.to_ascii_lowercase();
    if lowered.contains("int") {
        "INTEGER"
    } else if lowered.contains("numeric")
        || lowered.contains("decimal")
        || lowered.contains("float")
    {
        "REAL"
    } else if lowered.contains("date") {
        "TEXT"
    } else {
        "TEXT"
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &TableShape) -> String {
    let columns = table
        .columns
        .iter()
        .map(|column| {
            format!(
                "{} {}",
                quote_ident(&column.name),
                map_column_type(&column.source_type)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(&table.table_name), columns)
}

/// Check `sql` against the described tables.
///
/// `Err` means the throwaway store itself could not be opened; everything
/// the statement (or the table descriptions) did wrong comes back as
/// `Ok(Invalid { .. })` with the engine's message. The store is dropped on
/// every path out of this function.
pub fn validate_semantics(
    sql: &str,
    tables: &[TableShape],
) -> Result<ValidationResult, StoreError> {
    let conn = Connection::open_in_memory()?;

    for table in tables {
        if let Err(err) = conn.execute(&create_table_sql(table), []) {
            return Ok(ValidationResult::invalid(format!(
                "failed to create table \"{}\": {}",
                table.table_name, err
            )));
        }
    }

    // Plan without executing: preparing EXPLAIN compiles the inner
    // statement, which is where unknown tables and columns surface.
    let outcome = match conn.prepare(&format!("EXPLAIN {sql}")) {
        Ok(_) => Ok(ValidationResult::Valid),
        Err(err) => Ok(ValidationResult::invalid(err.to_string())),
    };
    outcome
}
