#[cfg(feature = "postgres")]
use anyhow::{Context, Result};
#[cfg(feature = "postgres")]
use sqlx::PgPool;
#[cfg(feature = "postgres")]
use tracing::info;

const MIGRATION_SQL: &str = include_str!("../../migrations/001_create_students.sql");

#[cfg(feature = "postgres")]
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    for (i, statement) in split_sql_statements(MIGRATION_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| {
                format!(
                    "Failed to execute migration statement {}: {}",
                    i + 1,
                    &statement[..statement.len().min(100)]
                )
            })?;
    }

    info!("Database migrations completed successfully");
    Ok(())
}

/// Split a script into statements on `;`, keeping `$$ ... $$` bodies whole
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_quote = false;

    for line in sql.lines() {
        let trimmed = line.trim();

        // Skip comments
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }

        // An odd number of `$$` on a line toggles the quoted state
        if trimmed.matches("$$").count() % 2 == 1 {
            in_dollar_quote = !in_dollar_quote;
        }

        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') && !in_dollar_quote {
            statements.push(current.trim().to_string());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_statements() {
        let statements = split_sql_statements(MIGRATION_SQL);

        assert_eq!(statements.len(), 6);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS students"));
        assert!(statements
            .iter()
            .any(|s| s.contains("students_email_key")));
    }

    #[test]
    fn test_function_body_kept_whole() {
        let statements = split_sql_statements(MIGRATION_SQL);
        let function = statements
            .iter()
            .find(|s| s.starts_with("CREATE OR REPLACE FUNCTION"))
            .unwrap();

        assert!(function.contains("NEW.updated_at = NOW();"));
        assert!(function.ends_with("language 'plpgsql';"));
    }

    #[test]
    fn test_split_skips_comments() {
        let statements = split_sql_statements("-- note\nSELECT 1;\n\nSELECT 2;");
        assert_eq!(statements, vec!["SELECT 1;", "SELECT 2;"]);
    }
}
