use sqlx::{postgres::PgRow, PgExecutor, PgPool, Row};
use uuid::Uuid;

use super::{decode_text, is_unique_violation};
use crate::models::statement::StatementStats;
use crate::models::transaction::{
    Category, MatchConfidence, MatchStatus, NewTransactionRecord, TransactionRecord,
    TransactionType,
};

const TRANSACTION_COLUMNS: &str = "id, statement_id, position, posting_date, description, \
     amount_cents, transaction_type, category, check_number, vendor_hint, match_status, \
     match_confidence, matched_expense_id, matched_at, notes, created_at";

fn transaction_from_row(row: &PgRow) -> Result<TransactionRecord, sqlx::Error> {
    Ok(TransactionRecord {
        id: row.try_get("id")?,
        statement_id: row.try_get("statement_id")?,
        position: row.try_get("position")?,
        posting_date: row.try_get("posting_date")?,
        description: row.try_get("description")?,
        amount_cents: row.try_get("amount_cents")?,
        transaction_type: decode_text(row, "transaction_type")?,
        category: decode_text(row, "category")?,
        check_number: row.try_get("check_number")?,
        vendor_hint: row.try_get("vendor_hint")?,
        match_status: decode_text(row, "match_status")?,
        match_confidence: decode_text(row, "match_confidence")?,
        matched_expense_id: row.try_get("matched_expense_id")?,
        matched_at: row.try_get("matched_at")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Remove every record of a statement ahead of a reparse.
pub async fn delete_for_statement(pool: &PgPool, statement_id: Uuid) -> Result<u64, sqlx::Error> {
    let done = sqlx::query("DELETE FROM transactions WHERE statement_id = $1")
        .bind(statement_id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}

pub async fn insert_transaction(
    pool: &PgPool,
    statement_id: Uuid,
    position: i32,
    record: &NewTransactionRecord,
) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO transactions
            (statement_id, position, posting_date, description, amount_cents,
             transaction_type, category, check_number, vendor_hint)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(statement_id)
    .bind(position)
    .bind(record.posting_date)
    .bind(&record.description)
    .bind(record.amount_cents)
    .bind(record.transaction_type.to_string())
    .bind(record.category.to_string())
    .bind(&record.check_number)
    .bind(&record.vendor_hint)
    .fetch_one(pool)
    .await?;

    row.try_get("id")
}

/// Records of a statement in extraction order.
pub async fn list_for_statement(
    pool: &PgPool,
    statement_id: Uuid,
) -> Result<Vec<TransactionRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE statement_id = $1 ORDER BY position"
    );
    let rows = sqlx::query(&sql).bind(statement_id).fetch_all(pool).await?;
    rows.iter().map(transaction_from_row).collect()
}

pub async fn list_unmatched(
    pool: &PgPool,
    statement_id: Uuid,
) -> Result<Vec<TransactionRecord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {TRANSACTION_COLUMNS} FROM transactions
        WHERE statement_id = $1 AND match_status = 'unmatched'
        ORDER BY position
        "#
    );
    let rows = sqlx::query(&sql).bind(statement_id).fetch_all(pool).await?;
    rows.iter().map(transaction_from_row).collect()
}

pub async fn get_transaction<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<TransactionRecord>, sqlx::Error> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1");
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
    row.as_ref().map(transaction_from_row).transpose()
}

/// Lock a record for the rest of the surrounding database transaction.
pub async fn get_transaction_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<TransactionRecord>, sqlx::Error> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
    row.as_ref().map(transaction_from_row).transpose()
}

/// Link an unmatched record to an unlinked expense. Returns false when the
/// record is no longer unmatched or the expense got linked elsewhere, including
/// a link committed between the `NOT EXISTS` check and the index update.
pub async fn commit_auto_match(
    pool: &PgPool,
    transaction_id: Uuid,
    expense_id: Uuid,
    confidence: MatchConfidence,
) -> Result<bool, sqlx::Error> {
    let done = sqlx::query(
        r#"
        UPDATE transactions
        SET match_status = 'matched',
            match_confidence = $1,
            matched_expense_id = $2,
            matched_at = NOW()
        WHERE id = $3
          AND match_status = 'unmatched'
          AND NOT EXISTS (SELECT 1 FROM transactions WHERE matched_expense_id = $2)
        "#,
    )
    .bind(confidence.to_string())
    .bind(expense_id)
    .bind(transaction_id)
    .execute(pool)
    .await;
    match done {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Set the link state of a record. `expense_id` must be present exactly when
/// `status` links an expense.
pub async fn set_link<'e>(
    executor: impl PgExecutor<'e>,
    transaction_id: Uuid,
    status: MatchStatus,
    confidence: MatchConfidence,
    expense_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE transactions
        SET match_status = $1,
            match_confidence = $2,
            matched_expense_id = $3,
            matched_at = CASE WHEN $3::uuid IS NULL THEN NULL ELSE NOW() END
        WHERE id = $4
        "#,
    )
    .bind(status.to_string())
    .bind(confidence.to_string())
    .bind(expense_id)
    .bind(transaction_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Mark a record ignored and keep the reason in its notes.
pub async fn set_ignored<'e>(
    executor: impl PgExecutor<'e>,
    transaction_id: Uuid,
    reason: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE transactions
        SET match_status = 'ignored',
            match_confidence = '',
            matched_expense_id = NULL,
            matched_at = NULL,
            notes = $1
        WHERE id = $2
        "#,
    )
    .bind(reason)
    .bind(transaction_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Change a record's type, amount and category, and clear its match.
pub async fn set_type<'e>(
    executor: impl PgExecutor<'e>,
    transaction_id: Uuid,
    transaction_type: TransactionType,
    amount_cents: i64,
    category: Category,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE transactions
        SET transaction_type = $1,
            amount_cents = $2,
            category = $3,
            match_status = 'unmatched',
            match_confidence = '',
            matched_expense_id = NULL,
            matched_at = NULL
        WHERE id = $4
        "#,
    )
    .bind(transaction_type.to_string())
    .bind(amount_cents)
    .bind(category.to_string())
    .bind(transaction_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Counts and totals over one statement's records.
pub async fn statement_stats(pool: &PgPool, statement_id: Uuid) -> Result<StatementStats, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(amount_cents) FILTER (WHERE amount_cents > 0), 0)::BIGINT AS credits,
            COALESCE(-SUM(amount_cents) FILTER (WHERE amount_cents < 0), 0)::BIGINT AS debits,
            COUNT(*) FILTER (WHERE match_status = 'matched') AS matched,
            COUNT(*) FILTER (WHERE match_status = 'unmatched') AS unmatched,
            COUNT(*) FILTER (WHERE match_status = 'ignored') AS ignored,
            COUNT(*) FILTER (WHERE match_status = 'created') AS created,
            COALESCE(SUM(ABS(amount_cents)) FILTER (WHERE transaction_type = 'deposit'), 0)::BIGINT AS deposits,
            COALESCE(SUM(ABS(amount_cents)) FILTER (WHERE transaction_type = 'debit'), 0)::BIGINT AS payments,
            COALESCE(SUM(ABS(amount_cents)) FILTER (WHERE transaction_type = 'check'), 0)::BIGINT AS checks,
            COALESCE(SUM(ABS(amount_cents)) FILTER (WHERE transaction_type = 'fee'), 0)::BIGINT AS fees
        FROM transactions
        WHERE statement_id = $1
        "#,
    )
    .bind(statement_id)
    .fetch_one(pool)
    .await?;

    Ok(StatementStats {
        total_transactions: row.try_get("total")?,
        total_credits_cents: row.try_get("credits")?,
        total_debits_cents: row.try_get("debits")?,
        matched_count: row.try_get("matched")?,
        unmatched_count: row.try_get("unmatched")?,
        ignored_count: row.try_get("ignored")?,
        created_count: row.try_get("created")?,
        deposits_cents: row.try_get("deposits")?,
        payments_cents: row.try_get("payments")?,
        checks_cents: row.try_get("checks")?,
        fees_cents: row.try_get("fees")?,
    })
}
