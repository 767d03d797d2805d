use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::expense::ExpenseCandidate;
use crate::models::statement::{StatementDocument, StatementStats};
use crate::models::transaction::{TransactionRecord, TransactionType};

/// Metadata portion of a statement upload.
#[derive(Debug, Deserialize, Validate)]
pub struct UploadRequest {
    #[garde(pattern(r"^\d{4}-(0[1-9]|1[0-2])$"))]
    pub statement_month: String,

    #[garde(length(min = 1, max = 255))]
    pub filename: String,
}

/// Response after uploading a statement.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub statement_id: Uuid,
    pub job_id: Uuid,
    pub status: String,
}

/// Response after queueing a reparse.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReparseResponse {
    pub statement_id: Uuid,
    pub job_id: Uuid,
}

/// A statement with its records and summary statistics.
#[derive(Debug, Serialize)]
pub struct StatementDetail {
    pub statement: StatementDocument,
    pub transactions: Vec<TransactionRecord>,
    pub stats: StatementStats,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MatchRequest {
    #[garde(skip)]
    pub expense_id: Uuid,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct IgnoreRequest {
    #[garde(inner(length(max = 500)))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    #[garde(length(min = 1, max = 200))]
    pub vendor_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTypeRequest {
    #[garde(skip)]
    pub transaction_type: TransactionType,
}

/// A candidate expense ranked for manual review.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub expense: ExpenseCandidate,
    pub amount_matches: bool,
    pub vendor_similarity: f64,
    pub days_apart: i64,
}
