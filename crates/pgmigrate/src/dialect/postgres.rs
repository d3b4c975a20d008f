//! PostgreSQL dialect for the ledger table.

use super::LedgerDialect;

/// PostgreSQL ledger dialect.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn surrogate_key_definition(&self) -> &'static str {
        "SERIAL PRIMARY KEY"
    }

    /// Folds each part to lower case before quoting, so `ChangeLog` names
    /// the same table PostgreSQL creates for an unquoted `ChangeLog`.
    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|part| format!("\"{}\"", part.to_lowercase()))
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> PostgresDialect {
        PostgresDialect::new()
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            dialect().create_table_sql("changelog"),
            "CREATE TABLE IF NOT EXISTS \"changelog\" (id SERIAL PRIMARY KEY, \"timestamp\" NUMERIC NOT NULL, description VARCHAR(500))"
        );
    }

    #[test]
    fn test_mixed_case_table_folds_to_lower_case() {
        assert_eq!(
            dialect().quote_identifier("Audit.ChangeLog"),
            "\"audit\".\"changelog\""
        );
        assert_eq!(
            dialect().count_sql("ChangeLog"),
            "SELECT COUNT(*) FROM \"changelog\" WHERE \"timestamp\" = $1"
        );
    }

    #[test]
    fn test_insert_uses_numbered_placeholders() {
        assert_eq!(
            dialect().insert_sql("changelog"),
            "INSERT INTO \"changelog\" (\"timestamp\", description) VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_count_and_delete() {
        assert_eq!(
            dialect().count_sql("changelog"),
            "SELECT COUNT(*) FROM \"changelog\" WHERE \"timestamp\" = $1"
        );
        assert_eq!(
            dialect().delete_sql("changelog"),
            "DELETE FROM \"changelog\" WHERE \"timestamp\" = $1"
        );
    }
}
