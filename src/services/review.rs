//! Statement lifecycle and manual review actions.
//!
//! Each record action runs in one database transaction with the record row
//! locked, so the link invariant (an expense id exactly when the record is
//! matched or created) holds between statements.

use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{expense_queries, is_unique_violation, statement_queries, transaction_queries};
use crate::models::api::{ReparseResponse, StatementDetail, Suggestion, UploadResponse};
use crate::models::expense::{ExpenseStatus, NewExpense, PaymentType};
use crate::models::job::{JobSnapshot, ParseStatementPayload, PARSE_STATEMENT};
use crate::models::statement::{StatementDocument, StatementPeriod, StatementStats, StatementStatus};
use crate::models::transaction::{MatchConfidence, MatchStatus, TransactionRecord, TransactionType};
use crate::services::matcher::{self, CANDIDATE_WINDOW_DAYS};
use crate::services::parser::categorize;
use crate::services::queue::{JobStore, QueueError};
use crate::services::storage::{DocumentStorage, StorageError};

pub const DEFAULT_IGNORE_REASON: &str = "Manually ignored";

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Statement not found: {0}")]
    StatementNotFound(Uuid),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(Uuid),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

pub struct ReviewService {
    pool: PgPool,
    storage: Arc<DocumentStorage>,
    jobs: Arc<dyn JobStore>,
    max_attempts: i32,
}

impl ReviewService {
    pub fn new(
        pool: PgPool,
        storage: Arc<DocumentStorage>,
        jobs: Arc<dyn JobStore>,
        max_attempts: i32,
    ) -> Self {
        Self {
            pool,
            storage,
            jobs,
            max_attempts,
        }
    }

    // ----- statements -----

    /// Store an uploaded statement and queue it for parsing.
    pub async fn upload(
        &self,
        period: StatementPeriod,
        original_filename: &str,
        bytes: &[u8],
    ) -> Result<UploadResponse, ReviewError> {
        if bytes.is_empty() {
            return Err(ReviewError::Invalid("statement file is empty".to_string()));
        }
        if statement_queries::get_statement_by_period(&self.pool, period).await?.is_some() {
            return Err(ReviewError::Conflict(format!(
                "a statement for {} already exists",
                period.label()
            )));
        }

        let statement_id = Uuid::new_v4();
        let file_key = DocumentStorage::statement_key(period, statement_id, original_filename);
        self.storage.store(&file_key, bytes).await?;

        let inserted = statement_queries::insert_statement(
            &self.pool,
            statement_id,
            period,
            &file_key,
            original_filename,
        )
        .await;
        if let Err(e) = inserted {
            if let Err(cleanup) = self.storage.delete(&file_key).await {
                tracing::warn!(file_key = %file_key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(if is_unique_violation(&e) {
                ReviewError::Conflict(format!("a statement for {} already exists", period.label()))
            } else {
                e.into()
            });
        }

        let job_id = self.queue_parse(statement_id, &file_key).await?;
        metrics::counter!("statement_uploads_total").increment(1);
        tracing::info!(
            statement_id = %statement_id,
            job_id = %job_id,
            period = %period,
            bytes = bytes.len(),
            "Statement uploaded"
        );

        Ok(UploadResponse {
            statement_id,
            job_id,
            status: StatementStatus::Pending.to_string(),
        })
    }

    async fn queue_parse(&self, statement_id: Uuid, file_key: &str) -> Result<Uuid, ReviewError> {
        let payload = serde_json::to_value(ParseStatementPayload {
            statement_id,
            file_key: file_key.to_string(),
        })
        .map_err(QueueError::from)?;
        let job_id = self.jobs.enqueue(PARSE_STATEMENT, payload, self.max_attempts).await?;
        statement_queries::mark_queued(&self.pool, statement_id, job_id).await?;
        Ok(job_id)
    }

    async fn statement(&self, id: Uuid) -> Result<StatementDocument, ReviewError> {
        statement_queries::get_statement(&self.pool, id)
            .await?
            .ok_or(ReviewError::StatementNotFound(id))
    }

    /// Queue a fresh parse. The job replaces all existing records.
    pub async fn reparse(&self, statement_id: Uuid) -> Result<ReparseResponse, ReviewError> {
        let statement = self.statement(statement_id).await?;
        let job_id = self.queue_parse(statement_id, &statement.file_key).await?;
        tracing::info!(
            statement_id = %statement_id,
            job_id = %job_id,
            previous_status = %statement.status,
            "Statement reparse queued"
        );
        Ok(ReparseResponse { statement_id, job_id })
    }

    pub async fn complete(&self, statement_id: Uuid) -> Result<StatementDocument, ReviewError> {
        if !statement_queries::mark_completed(&self.pool, statement_id).await? {
            return Err(ReviewError::StatementNotFound(statement_id));
        }
        tracing::info!(statement_id = %statement_id, "Statement reconciliation completed");
        self.statement(statement_id).await
    }

    /// Remove a statement, its records and its stored file.
    pub async fn delete(&self, statement_id: Uuid) -> Result<(), ReviewError> {
        let statement = self.statement(statement_id).await?;
        statement_queries::delete_statement(&self.pool, statement_id).await?;
        if let Err(e) = self.storage.delete(&statement.file_key).await {
            tracing::warn!(
                statement_id = %statement_id,
                file_key = %statement.file_key,
                error = %e,
                "Statement deleted but its file could not be removed"
            );
        }
        tracing::info!(statement_id = %statement_id, period = %statement.period, "Statement deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<StatementDocument>, ReviewError> {
        Ok(statement_queries::list_statements(&self.pool).await?)
    }

    pub async fn detail(&self, statement_id: Uuid) -> Result<StatementDetail, ReviewError> {
        let statement = self.statement(statement_id).await?;
        let transactions = transaction_queries::list_for_statement(&self.pool, statement_id).await?;
        let stats = transaction_queries::statement_stats(&self.pool, statement_id).await?;
        Ok(StatementDetail {
            statement,
            transactions,
            stats,
        })
    }

    pub async fn stats(&self, statement_id: Uuid) -> Result<StatementStats, ReviewError> {
        self.statement(statement_id).await?;
        Ok(transaction_queries::statement_stats(&self.pool, statement_id).await?)
    }

    pub async fn job(&self, job_id: Uuid) -> Result<JobSnapshot, ReviewError> {
        let job = self.jobs.get(job_id).await?.ok_or(ReviewError::JobNotFound(job_id))?;
        Ok(JobSnapshot::from(&job))
    }

    // ----- records -----

    async fn locked_record(
        conn: &mut PgConnection,
        transaction_id: Uuid,
    ) -> Result<TransactionRecord, ReviewError> {
        transaction_queries::get_transaction_for_update(&mut *conn, transaction_id)
            .await?
            .ok_or(ReviewError::TransactionNotFound(transaction_id))
    }

    /// Delete the expense a `created` record produced. Call after the link
    /// has been cleared.
    async fn drop_created_expense(
        conn: &mut PgConnection,
        record: &TransactionRecord,
    ) -> Result<(), ReviewError> {
        if record.match_status == MatchStatus::Created {
            if let Some(expense_id) = record.matched_expense_id {
                expense_queries::delete_expense(&mut *conn, expense_id).await?;
                tracing::info!(
                    transaction_id = %record.id,
                    expense_id = %expense_id,
                    "Deleted expense created from transaction"
                );
            }
        }
        Ok(())
    }

    async fn reload(&self, transaction_id: Uuid) -> Result<TransactionRecord, ReviewError> {
        transaction_queries::get_transaction(&self.pool, transaction_id)
            .await?
            .ok_or(ReviewError::TransactionNotFound(transaction_id))
    }

    /// Link a record to a paid, unlinked expense by hand.
    pub async fn match_expense(
        &self,
        transaction_id: Uuid,
        expense_id: Uuid,
    ) -> Result<TransactionRecord, ReviewError> {
        let mut tx = self.pool.begin().await?;
        let record = Self::locked_record(&mut tx, transaction_id).await?;

        if record.amount_cents >= 0 {
            return Err(ReviewError::Invalid(
                "only outgoing transactions can be matched to expenses".to_string(),
            ));
        }
        if record.match_status.links_expense() {
            return Err(ReviewError::Conflict(
                "transaction is already linked to an expense; unmatch it first".to_string(),
            ));
        }

        let expense = expense_queries::get_expense(&mut *tx, expense_id)
            .await?
            .ok_or(ReviewError::ExpenseNotFound(expense_id))?;
        if expense.status != ExpenseStatus::Paid {
            return Err(ReviewError::Conflict(format!(
                "expense {expense_id} is not marked paid"
            )));
        }
        if expense_queries::is_linked(&mut *tx, expense_id).await? {
            return Err(ReviewError::Conflict(format!(
                "expense {expense_id} is already linked to another transaction"
            )));
        }

        let linked = transaction_queries::set_link(
            &mut *tx,
            transaction_id,
            MatchStatus::Matched,
            MatchConfidence::Manual,
            Some(expense_id),
        )
        .await;
        match linked {
            Err(e) if is_unique_violation(&e) => {
                return Err(ReviewError::Conflict(format!(
                    "expense {expense_id} is already linked to another transaction"
                )))
            }
            other => other?,
        }
        tx.commit().await?;

        tracing::info!(transaction_id = %transaction_id, expense_id = %expense_id, "Transaction matched manually");
        self.reload(transaction_id).await
    }

    /// Clear a record's link. An expense created from the record is deleted.
    pub async fn unmatch(&self, transaction_id: Uuid) -> Result<TransactionRecord, ReviewError> {
        let mut tx = self.pool.begin().await?;
        let record = Self::locked_record(&mut tx, transaction_id).await?;

        transaction_queries::set_link(
            &mut *tx,
            transaction_id,
            MatchStatus::Unmatched,
            MatchConfidence::None,
            None,
        )
        .await?;
        Self::drop_created_expense(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction_id,
            previous_status = %record.match_status,
            "Transaction unmatched"
        );
        self.reload(transaction_id).await
    }

    pub async fn ignore(
        &self,
        transaction_id: Uuid,
        reason: Option<&str>,
    ) -> Result<TransactionRecord, ReviewError> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_IGNORE_REASON);

        let mut tx = self.pool.begin().await?;
        let record = Self::locked_record(&mut tx, transaction_id).await?;
        transaction_queries::set_ignored(&mut *tx, transaction_id, reason).await?;
        Self::drop_created_expense(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(transaction_id = %transaction_id, reason = %reason, "Transaction ignored");
        self.reload(transaction_id).await
    }

    /// Book a paid expense from the record and link it.
    pub async fn create_expense(
        &self,
        transaction_id: Uuid,
        vendor_name: &str,
    ) -> Result<TransactionRecord, ReviewError> {
        let vendor_name = vendor_name.trim();
        if vendor_name.is_empty() {
            return Err(ReviewError::Invalid("vendor name is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let record = Self::locked_record(&mut tx, transaction_id).await?;
        if record.amount_cents >= 0 {
            return Err(ReviewError::Invalid(
                "expenses can only be created from outgoing transactions".to_string(),
            ));
        }
        if record.match_status.links_expense() {
            return Err(ReviewError::Conflict(
                "transaction is already linked to an expense; unmatch it first".to_string(),
            ));
        }

        let expense = expense_from_record(&record, vendor_name);
        let expense_id = expense_queries::insert_paid_expense(&mut *tx, &expense).await?;
        transaction_queries::set_link(
            &mut *tx,
            transaction_id,
            MatchStatus::Created,
            MatchConfidence::Created,
            Some(expense_id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction_id,
            expense_id = %expense_id,
            vendor = %vendor_name,
            "Expense created from transaction"
        );
        self.reload(transaction_id).await
    }

    /// Correct a record's type. The amount takes the new type's sign and the
    /// match is reset.
    pub async fn update_type(
        &self,
        transaction_id: Uuid,
        transaction_type: TransactionType,
    ) -> Result<TransactionRecord, ReviewError> {
        let mut tx = self.pool.begin().await?;
        let record = Self::locked_record(&mut tx, transaction_id).await?;

        let amount_cents = transaction_type.signed(record.amount_cents);
        let category = categorize(transaction_type, &record.description, amount_cents);
        transaction_queries::set_type(&mut *tx, transaction_id, transaction_type, amount_cents, category)
            .await?;
        Self::drop_created_expense(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction_id,
            from = %record.transaction_type,
            to = %transaction_type,
            amount_cents,
            "Transaction type corrected"
        );
        self.reload(transaction_id).await
    }

    /// Ranked candidate expenses for one record.
    pub async fn suggestions(&self, transaction_id: Uuid) -> Result<Vec<Suggestion>, ReviewError> {
        let record = self.reload(transaction_id).await?;
        let statement = self.statement(record.statement_id).await?;
        let (from, to) = statement.period.widened(CANDIDATE_WINDOW_DAYS);
        let candidates = expense_queries::unlinked_paid_candidates(&self.pool, from, to).await?;
        Ok(matcher::rank_suggestions(&record, &candidates))
    }
}

/// The expense booked when a record has no ledger counterpart.
pub fn expense_from_record(record: &TransactionRecord, vendor_name: &str) -> NewExpense {
    NewExpense {
        vendor_name: vendor_name.to_string(),
        amount_cents: record.amount_cents.abs(),
        date_paid: record.posting_date,
        payment_type: PaymentType::from(record.transaction_type),
        check_number: record.check_number.clone(),
        notes: format!("Created from bank transaction: {}", record.description),
    }
}
