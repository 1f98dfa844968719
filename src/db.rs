//! Database module
//!
//! Connectivity and schema verification at startup. Migrations are raw
//! SQL files in migrations/.

use sqlx::PgPool;

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check that the given tables exist on this database
pub async fn check_tables(pool: &PgPool, tables: &[&str]) -> Result<bool, sqlx::Error> {
    for table in tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
