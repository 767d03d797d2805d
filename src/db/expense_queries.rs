use chrono::NaiveDate;
use sqlx::{postgres::PgRow, PgExecutor, PgPool, Row};
use uuid::Uuid;

use super::{decode_optional_text, decode_text};
use crate::models::expense::{Expense, ExpenseCandidate, NewExpense};

fn expense_from_row(row: &PgRow) -> Result<Expense, sqlx::Error> {
    Ok(Expense {
        id: row.try_get("id")?,
        vendor_name: row.try_get("vendor_name")?,
        amount_cents: row.try_get("amount_cents")?,
        expense_date: row.try_get("expense_date")?,
        date_paid: row.try_get("date_paid")?,
        status: decode_text(row, "status")?,
        payment_type: decode_optional_text(row, "payment_type")?,
        check_number: row.try_get("check_number")?,
        notes: row.try_get("notes")?,
    })
}

/// Paid expenses in `[from, to]` that no bank record links to yet, oldest
/// payment first.
pub async fn unlinked_paid_candidates(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ExpenseCandidate>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT e.id, e.vendor_name, e.amount_cents, e.date_paid, e.check_number
        FROM expenses e
        WHERE e.status = 'paid'
          AND e.date_paid BETWEEN $1 AND $2
          AND NOT EXISTS (
              SELECT 1 FROM transactions t WHERE t.matched_expense_id = e.id
          )
        ORDER BY e.date_paid, e.id
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(ExpenseCandidate {
                id: r.try_get("id")?,
                vendor_name: r.try_get("vendor_name")?,
                amount_cents: r.try_get("amount_cents")?,
                date_paid: r.try_get("date_paid")?,
                check_number: r.try_get("check_number")?,
            })
        })
        .collect()
}

pub async fn get_expense<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<Expense>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, vendor_name, amount_cents, expense_date, date_paid, status,
               payment_type, check_number, notes
        FROM expenses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(expense_from_row).transpose()
}

/// Whether any bank record links to the expense.
pub async fn is_linked<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM transactions WHERE matched_expense_id = $1) AS linked",
    )
    .bind(id)
    .fetch_one(executor)
    .await?;
    row.try_get("linked")
}

/// Insert a paid expense and return its id.
pub async fn insert_paid_expense<'e>(
    executor: impl PgExecutor<'e>,
    expense: &NewExpense,
) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO expenses
            (vendor_name, amount_cents, expense_date, date_paid, status,
             payment_type, check_number, notes)
        VALUES ($1, $2, $3, $3, 'paid', $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&expense.vendor_name)
    .bind(expense.amount_cents)
    .bind(expense.date_paid)
    .bind(expense.payment_type.to_string())
    .bind(&expense.check_number)
    .bind(&expense.notes)
    .fetch_one(executor)
    .await?;

    row.try_get("id")
}

pub async fn delete_expense<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
