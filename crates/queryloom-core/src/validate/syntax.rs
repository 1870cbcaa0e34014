//! Statement-level syntax validation via a full SQL parse.

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::ValidationResult;

/// Parse `sql` and report the parser's verdict.
///
/// The whole grammar is in play (CTEs, nested selects, window functions,
/// joins); a failure carries the parser's message verbatim so the repair
/// collaborator sees exactly what a human would. Exactly one statement is
/// required: the pipeline validates a single generated query at a time.
pub fn validate_syntax(sql: &str) -> ValidationResult {
    let dialect = GenericDialect {};
    match Parser::parse_sql(&dialect, sql) {
        Ok(statements) if statements.is_empty() => {
            ValidationResult::invalid("no SQL statement found in input")
        }
        Ok(statements) if statements.len() > 1 => ValidationResult::invalid(format!(
            "expected a single SQL statement, found {}",
            statements.len()
        )),
        Ok(_) => ValidationResult::Valid,
        Err(err) => ValidationResult::invalid(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_select_is_valid() {
        assert_eq!(validate_syntax("SELECT 1"), ValidationResult::Valid);
    }

    #[test]
    fn keyword_typos_are_rejected_with_the_parser_message() {
        match validate_syntax("SELEC * FORM t") {
            ValidationResult::Invalid { message } => assert!(!message.is_empty()),
            ValidationResult::Valid => panic!("typo accepted"),
        }
    }

    #[test]
    fn ctes_window_functions_and_joins_parse() {
        let sql = "WITH monthly AS (
                       SELECT entity_id, period, SUM(value) AS value
                       FROM facts GROUP BY entity_id, period
                   )
                   SELECT m.period,
                          e.name,
                          m.value,
                          RANK() OVER (PARTITION BY m.period ORDER BY m.value DESC) AS rnk
                   FROM monthly m
                   JOIN entities e ON e.id = m.entity_id
                   WHERE m.period >= '2024-01-01'";
        assert_eq!(validate_syntax(sql), ValidationResult::Valid);
    }

    #[test]
    fn nested_selects_parse() {
        let sql = "SELECT name FROM (SELECT name, value FROM t WHERE value > (SELECT AVG(value) FROM t)) inner_t";
        assert_eq!(validate_syntax(sql), ValidationResult::Valid);
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(!validate_syntax("").is_valid());
        assert!(!validate_syntax("   ;  ").is_valid());
    }

    #[test]
    fn multiple_statements_are_rejected() {
        match validate_syntax("SELECT 1; SELECT 2") {
            ValidationResult::Invalid { message } => {
                assert!(message.contains("single SQL statement"))
            }
            ValidationResult::Valid => panic!("multiple statements accepted"),
        }
    }

    #[test]
    fn unbalanced_parens_are_rejected() {
        assert!(!validate_syntax("SELECT (1 + 2 FROM t").is_valid());
    }
}
