use anyhow::{Context, Result};

use super::connection::DbConn;

/// Creates the tables and indexes that do not exist yet. Existing data is kept.
pub fn initialize_schema(conn: &mut DbConn) -> Result<()> {
    let schema_sql = include_str!("schema.sql");
    let statements = split_sql_statements(schema_sql);

    for (idx, statement) in statements.iter().enumerate() {
        execute_sql(conn, statement)
            .with_context(|| format!("Failed to execute statement {}", idx + 1))?;
    }

    log::info!("Database schema ready ({} statements)", statements.len());
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn execute_sql(conn: &mut DbConn, sql: &str) -> Result<()> {
    conn.execute(sql, [])
        .context("Failed to execute SQL statement")
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::{create_memory_pool, get_connection};

    #[test]
    fn test_split_skips_blank_statements() {
        let statements = split_sql_statements("CREATE TABLE a (x);\n\n;CREATE TABLE b (y);\n");
        assert_eq!(statements, vec!["CREATE TABLE a (x)", "CREATE TABLE b (y)"]);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let pool = create_memory_pool().unwrap();
        let mut conn = get_connection(&pool).unwrap();

        initialize_schema(&mut conn).unwrap();
        initialize_schema(&mut conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type = 'table' AND name IN ('votes', 'entities')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
