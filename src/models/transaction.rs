use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Kind of bank transaction, fixed by the statement section it came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Credit,
    Check,
    Debit,
    Withdrawal,
    Fee,
}

impl TransactionType {
    /// Money in for deposits and credits, money out for everything else.
    pub fn is_inflow(self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::Credit)
    }

    /// Apply this type's sign to an amount of any sign.
    pub fn signed(self, cents: i64) -> i64 {
        if self.is_inflow() {
            cents.abs()
        } else {
            -cents.abs()
        }
    }

    /// Whether `cents` carries the sign this type requires. Zero fits every type.
    pub fn sign_matches(self, cents: i64) -> bool {
        if self.is_inflow() {
            cents >= 0
        } else {
            cents <= 0
        }
    }
}

/// Heuristic tag derived from the description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    IncomeCards,
    IncomeDelivery,
    IncomeOther,
    Refund,
    Expense,
    ExpenseCheck,
    Fee,
    Transfer,
    Atm,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    Unmatched,
    Matched,
    Ignored,
    Created,
}

impl MatchStatus {
    /// Statuses that carry a linked expense id.
    pub fn links_expense(self) -> bool {
        matches!(self, MatchStatus::Matched | MatchStatus::Created)
    }
}

/// How a record got linked to an expense. `None` is stored as the empty string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
pub enum MatchConfidence {
    #[serde(rename = "auto_exact")]
    #[strum(serialize = "auto_exact")]
    AutoExact,
    #[serde(rename = "auto_fuzzy")]
    #[strum(serialize = "auto_fuzzy")]
    AutoFuzzy,
    #[serde(rename = "manual")]
    #[strum(serialize = "manual")]
    Manual,
    #[serde(rename = "created")]
    #[strum(serialize = "created")]
    Created,
    #[serde(rename = "")]
    #[strum(serialize = "")]
    None,
}

/// A persisted bank transaction belonging to one statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub statement_id: Uuid,
    pub position: i32,
    pub posting_date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub category: Category,
    pub check_number: Option<String>,
    pub vendor_hint: String,
    pub match_status: MatchStatus,
    pub match_confidence: MatchConfidence,
    pub matched_expense_id: Option<Uuid>,
    pub matched_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Only outgoing, non-fee records can be reconciled against expenses.
    pub fn is_match_target(&self) -> bool {
        self.amount_cents < 0 && self.transaction_type != TransactionType::Fee
    }
}

/// A parsed record ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransactionRecord {
    pub posting_date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub category: Category,
    pub check_number: Option<String>,
    pub vendor_hint: String,
}

/// Format integer cents as a signed decimal string, e.g. `-1525.50`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_mapping() {
        assert_eq!(TransactionType::Deposit.signed(-1250), 1250);
        assert_eq!(TransactionType::Credit.signed(99), 99);
        for t in [
            TransactionType::Check,
            TransactionType::Debit,
            TransactionType::Withdrawal,
            TransactionType::Fee,
        ] {
            assert_eq!(t.signed(500), -500);
            assert!(t.sign_matches(-500));
            assert!(!t.sign_matches(500));
        }
    }

    #[test]
    fn test_confidence_empty_string() {
        assert_eq!(MatchConfidence::None.to_string(), "");
        assert_eq!("".parse::<MatchConfidence>().unwrap(), MatchConfidence::None);
        assert_eq!("auto_exact".parse::<MatchConfidence>().unwrap(), MatchConfidence::AutoExact);
        assert_eq!(serde_json::to_string(&MatchConfidence::AutoFuzzy).unwrap(), "\"auto_fuzzy\"");
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::ExpenseCheck.to_string(), "expense_check");
        assert_eq!("income_delivery".parse::<Category>().unwrap(), Category::IncomeDelivery);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(-152550), "-1525.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(0), "0.00");
    }
}
