use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::transaction::TransactionType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExpenseStatus {
    Paid,
    NotPaid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Check,
    Debit,
    Credit,
}

impl From<TransactionType> for PaymentType {
    fn from(t: TransactionType) -> Self {
        match t {
            TransactionType::Check => PaymentType::Check,
            TransactionType::Credit => PaymentType::Credit,
            _ => PaymentType::Debit,
        }
    }
}

/// An expense from the ledger. Amounts are positive cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub vendor_name: String,
    pub amount_cents: i64,
    pub expense_date: NaiveDate,
    pub date_paid: Option<NaiveDate>,
    pub status: ExpenseStatus,
    pub payment_type: Option<PaymentType>,
    pub check_number: Option<String>,
    pub notes: String,
}

/// Fields for an expense created from a bank transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub vendor_name: String,
    pub amount_cents: i64,
    pub date_paid: NaiveDate,
    pub payment_type: PaymentType,
    pub check_number: Option<String>,
    pub notes: String,
}

/// The slice of a paid expense the matcher looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseCandidate {
    pub id: Uuid,
    pub vendor_name: String,
    pub amount_cents: i64,
    pub date_paid: NaiveDate,
    pub check_number: Option<String>,
}
