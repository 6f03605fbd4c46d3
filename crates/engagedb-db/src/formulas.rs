//! Database operations for `formula_settings` and the `active_formula` pointer.

use chrono::{DateTime, Utc};
use engagedb_core::FormulaSetting;
use sqlx::PgPool;

use crate::DbError;

/// A row from `formula_settings`, with `is_active` derived from the pointer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FormulaSettingRow {
    pub id: i64,
    pub name: String,
    pub engagement_formula: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<FormulaSettingRow> for FormulaSetting {
    fn from(row: FormulaSettingRow) -> Self {
        FormulaSetting {
            id: row.id,
            name: row.name,
            engagement_formula: row.engagement_formula,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Appends a formula and points `active_formula` at it.
///
/// Both statements run in one transaction, so readers always see exactly one
/// active formula once the first one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement or the commit fails.
pub async fn insert_and_activate_formula(
    pool: &PgPool,
    name: &str,
    engagement_formula: &str,
) -> Result<FormulaSettingRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, FormulaSettingRow>(
        "INSERT INTO formula_settings (name, engagement_formula) \
         VALUES ($1, $2) \
         RETURNING id, name, engagement_formula, TRUE AS is_active, created_at",
    )
    .bind(name)
    .bind(engagement_formula)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO active_formula (singleton, formula_id) \
         VALUES (TRUE, $1) \
         ON CONFLICT (singleton) DO UPDATE SET \
             formula_id = EXCLUDED.formula_id, \
             updated_at = NOW()",
    )
    .bind(row.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_active_formula(pool: &PgPool) -> Result<Option<FormulaSettingRow>, DbError> {
    let row = sqlx::query_as::<_, FormulaSettingRow>(
        "SELECT f.id, f.name, f.engagement_formula, TRUE AS is_active, f.created_at \
         FROM active_formula a \
         JOIN formula_settings f ON f.id = a.formula_id",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Every saved formula, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_formula_history(pool: &PgPool) -> Result<Vec<FormulaSettingRow>, DbError> {
    let rows = sqlx::query_as::<_, FormulaSettingRow>(
        "SELECT f.id, f.name, f.engagement_formula, \
                (a.formula_id IS NOT NULL) AS is_active, f.created_at \
         FROM formula_settings f \
         LEFT JOIN active_formula a ON a.formula_id = f.id \
         ORDER BY f.id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
