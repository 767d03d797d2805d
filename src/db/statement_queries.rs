use chrono::NaiveDate;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::decode_text;
use crate::models::statement::{
    DeclaredSubtotals, StatementDocument, StatementPeriod, StatementStatus,
};

const STATEMENT_COLUMNS: &str = "id, period_start, status, account_last_four, \
     beginning_balance_cents, ending_balance_cents, declared_deposits_cents, \
     declared_payments_cents, declared_checks_cents, declared_fees_cents, file_key, \
     original_filename, parse_job_id, notes, parsed_at, reconciled_at, created_at, updated_at";

fn statement_from_row(row: &PgRow) -> Result<StatementDocument, sqlx::Error> {
    let period_start: NaiveDate = row.try_get("period_start")?;
    Ok(StatementDocument {
        id: row.try_get("id")?,
        period: StatementPeriod::from_date(period_start),
        status: decode_text(row, "status")?,
        account_last_four: row.try_get("account_last_four")?,
        beginning_balance_cents: row.try_get("beginning_balance_cents")?,
        ending_balance_cents: row.try_get("ending_balance_cents")?,
        declared: DeclaredSubtotals {
            deposits_cents: row.try_get("declared_deposits_cents")?,
            payments_cents: row.try_get("declared_payments_cents")?,
            checks_cents: row.try_get("declared_checks_cents")?,
            fees_cents: row.try_get("declared_fees_cents")?,
        },
        file_key: row.try_get("file_key")?,
        original_filename: row.try_get("original_filename")?,
        parse_job_id: row.try_get("parse_job_id")?,
        notes: row.try_get("notes")?,
        parsed_at: row.try_get("parsed_at")?,
        reconciled_at: row.try_get("reconciled_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a pending statement. Fails with a unique violation when the
/// period already has one.
pub async fn insert_statement(
    pool: &PgPool,
    id: Uuid,
    period: StatementPeriod,
    file_key: &str,
    original_filename: &str,
) -> Result<StatementDocument, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO statements (id, period_start, file_key, original_filename)
        VALUES ($1, $2, $3, $4)
        RETURNING {STATEMENT_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(period.first_day())
        .bind(file_key)
        .bind(original_filename)
        .fetch_one(pool)
        .await?;

    statement_from_row(&row)
}

pub async fn get_statement(pool: &PgPool, id: Uuid) -> Result<Option<StatementDocument>, sqlx::Error> {
    let sql = format!("SELECT {STATEMENT_COLUMNS} FROM statements WHERE id = $1");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(statement_from_row).transpose()
}

pub async fn get_statement_by_period(
    pool: &PgPool,
    period: StatementPeriod,
) -> Result<Option<StatementDocument>, sqlx::Error> {
    let sql = format!("SELECT {STATEMENT_COLUMNS} FROM statements WHERE period_start = $1");
    let row = sqlx::query(&sql)
        .bind(period.first_day())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(statement_from_row).transpose()
}

/// All statements, newest period first.
pub async fn list_statements(pool: &PgPool) -> Result<Vec<StatementDocument>, sqlx::Error> {
    let sql = format!("SELECT {STATEMENT_COLUMNS} FROM statements ORDER BY period_start DESC");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(statement_from_row).collect()
}

pub async fn set_status(pool: &PgPool, id: Uuid, status: StatementStatus) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE statements SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.to_string())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Reset to pending and remember the job that will parse the statement.
pub async fn mark_queued(pool: &PgPool, id: Uuid, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE statements
        SET status = 'pending', parse_job_id = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(job_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Store the header fields read from the statement text.
pub async fn update_parsed_header(
    pool: &PgPool,
    id: Uuid,
    account_last_four: &str,
    beginning_balance_cents: i64,
    ending_balance_cents: i64,
    declared: &DeclaredSubtotals,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE statements
        SET account_last_four = $1,
            beginning_balance_cents = $2,
            ending_balance_cents = $3,
            declared_deposits_cents = $4,
            declared_payments_cents = $5,
            declared_checks_cents = $6,
            declared_fees_cents = $7,
            updated_at = NOW()
        WHERE id = $8
        "#,
    )
    .bind(account_last_four)
    .bind(beginning_balance_cents)
    .bind(ending_balance_cents)
    .bind(declared.deposits_cents)
    .bind(declared.payments_cents)
    .bind(declared.checks_cents)
    .bind(declared.fees_cents)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_parsed(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE statements SET status = 'parsed', parsed_at = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_completed(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let done = sqlx::query(
        r#"
        UPDATE statements
        SET status = 'completed', reconciled_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}

/// Delete a statement; its transaction records go with it.
pub async fn delete_statement(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let done = sqlx::query("DELETE FROM statements WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}
