use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{statement_queries, transaction_queries};
use crate::models::job::{ParseStatementPayload, PARSE_STATEMENT};
use crate::models::statement::{StatementPeriod, StatementStatus};
use crate::services::matcher;
use crate::services::parser::{ParseError, ParsedStatement, StatementParser};
use crate::services::storage::{DocumentStorage, StorageError};
use crate::services::worker::{HandlerError, JobContext, JobHandler};

/// Records inserted between progress updates.
const PROGRESS_BATCH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ParseJobError {
    #[error("Invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Statement not found: {0}")]
    StatementNotFound(Uuid),

    #[error("Failed to load statement file: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to parse statement: {0}")]
    Parse(#[from] ParseError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Parse cancelled after {inserted} records")]
    Cancelled { inserted: usize },
}

/// Handler for `parse_statement` jobs: extract, parse, replace the
/// statement's records, then auto-match them.
pub struct ParseStatementHandler {
    pool: PgPool,
    storage: Arc<DocumentStorage>,
    parser: StatementParser,
}

impl ParseStatementHandler {
    pub fn new(pool: PgPool, storage: Arc<DocumentStorage>, parser: StatementParser) -> Self {
        Self {
            pool,
            storage,
            parser,
        }
    }

    async fn extract_and_parse(
        &self,
        file_key: &str,
        period: StatementPeriod,
    ) -> Result<ParsedStatement, ParseJobError> {
        let scratch = self.storage.materialize(file_key).await?;
        let parsed = self.parser.parse_file(scratch.path(), Some(period)).await?;
        Ok(parsed)
    }

    async fn run(&self, ctx: &JobContext) -> Result<serde_json::Value, ParseJobError> {
        let payload: ParseStatementPayload = ctx.payload()?;
        let statement_id = payload.statement_id;
        let statement = statement_queries::get_statement(&self.pool, statement_id)
            .await?
            .ok_or(ParseJobError::StatementNotFound(statement_id))?;

        statement_queries::set_status(&self.pool, statement_id, StatementStatus::Parsing).await?;
        ctx.report_progress(5).await;

        let parsed = match self.extract_and_parse(&payload.file_key, statement.period).await {
            Ok(parsed) => parsed,
            Err(e) => {
                if let Err(reset) =
                    statement_queries::set_status(&self.pool, statement_id, StatementStatus::Pending).await
                {
                    tracing::warn!(statement_id = %statement_id, error = %reset, "Failed to reset statement status");
                }
                return Err(e);
            }
        };
        ctx.report_progress(40).await;

        statement_queries::update_parsed_header(
            &self.pool,
            statement_id,
            &parsed.account_last_four,
            parsed.beginning_balance_cents,
            parsed.ending_balance_cents,
            &parsed.declared_subtotals(),
        )
        .await?;
        ctx.report_progress(50).await;

        let removed = transaction_queries::delete_for_statement(&self.pool, statement_id).await?;
        if removed > 0 {
            tracing::info!(statement_id = %statement_id, removed, "Removed records from previous parse");
        }

        let total = parsed.transactions.len();
        for (idx, record) in parsed.transactions.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(ParseJobError::Cancelled { inserted: idx });
            }
            transaction_queries::insert_transaction(&self.pool, statement_id, idx as i32, record).await?;

            let inserted = idx + 1;
            if inserted % PROGRESS_BATCH == 0 || inserted == total {
                ctx.report_progress(50 + (40 * inserted / total) as i32).await;
            }
        }
        metrics::counter!("transactions_parsed_total").increment(total as u64);
        ctx.report_progress(90).await;

        let summary = matcher::auto_match_statement(&self.pool, statement_id, statement.period).await?;
        ctx.report_progress(95).await;

        statement_queries::mark_parsed(&self.pool, statement_id).await?;

        let verification = parsed.verification();
        if !verification.is_clean() {
            tracing::warn!(
                statement_id = %statement_id,
                balance_delta_cents = verification.balance_delta_cents,
                subtotals = ?verification.subtotals,
                "Parsed totals differ from the statement's own totals"
            );
        }

        tracing::info!(
            statement_id = %statement_id,
            period = %statement.period,
            transactions = total,
            matched = summary.committed,
            "Statement parsed"
        );

        Ok(json!({
            "statement_id": statement_id,
            "transactions_count": total,
            "matched_count": summary.committed,
            "account_last_four": parsed.account_last_four,
            "beginning_balance_cents": parsed.beginning_balance_cents,
            "ending_balance_cents": parsed.ending_balance_cents,
            "verification": verification,
        }))
    }
}

#[async_trait]
impl JobHandler for ParseStatementHandler {
    fn job_type(&self) -> &'static str {
        PARSE_STATEMENT
    }

    async fn execute(&self, ctx: &JobContext) -> Result<serde_json::Value, HandlerError> {
        Ok(self.run(ctx).await?)
    }
}
