//! Reconciliation of bank records against paid expenses.
//!
//! Planning is pure: [`plan_matches`] walks the unmatched records in order and
//! tries each rule in precedence order against the remaining candidates. A
//! candidate is used at most once per run. Amounts must always be equal to the
//! cent; only dates and vendor names are compared loosely.

use sqlx::PgPool;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::db::{expense_queries, transaction_queries};
use crate::models::api::Suggestion;
use crate::models::expense::ExpenseCandidate;
use crate::models::statement::StatementPeriod;
use crate::models::transaction::{MatchConfidence, MatchStatus, TransactionRecord};

/// Candidate expenses are paid within the statement month widened by this.
pub const CANDIDATE_WINDOW_DAYS: i64 = 7;

/// Largest posting/payment date gap for an amount-and-date match.
pub const DATE_TOLERANCE_DAYS: i64 = 3;

pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    CheckNumber,
    AmountAndDate,
    AmountAndVendor,
}

impl MatchRule {
    /// Rules in precedence order.
    pub const ALL: [MatchRule; 3] = [
        MatchRule::CheckNumber,
        MatchRule::AmountAndDate,
        MatchRule::AmountAndVendor,
    ];

    pub fn confidence(self) -> MatchConfidence {
        match self {
            MatchRule::CheckNumber => MatchConfidence::AutoExact,
            MatchRule::AmountAndDate | MatchRule::AmountAndVendor => MatchConfidence::AutoFuzzy,
        }
    }

    pub fn accepts(self, record: &TransactionRecord, candidate: &ExpenseCandidate) -> bool {
        let same_amount = candidate.amount_cents == record.amount_cents.abs();
        match self {
            MatchRule::CheckNumber => {
                match (record.check_number.as_deref(), candidate.check_number.as_deref()) {
                    (Some(a), Some(b)) => !a.trim().is_empty() && a.trim() == b.trim(),
                    _ => false,
                }
            }
            MatchRule::AmountAndDate => {
                same_amount
                    && (candidate.date_paid - record.posting_date).num_days().abs()
                        <= DATE_TOLERANCE_DAYS
            }
            MatchRule::AmountAndVendor => {
                let hint = record.vendor_hint.trim().to_lowercase();
                same_amount
                    && !hint.is_empty()
                    && candidate.vendor_name.to_lowercase().contains(&hint)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMatch {
    pub transaction_id: Uuid,
    pub expense_id: Uuid,
    pub rule: MatchRule,
}

/// Pick at most one candidate per record. Records that are not unmatched
/// outflows are passed over.
pub fn plan_matches(
    records: &[TransactionRecord],
    candidates: &[ExpenseCandidate],
) -> Vec<PlannedMatch> {
    let mut pool: Vec<&ExpenseCandidate> = candidates.iter().collect();
    let mut planned = Vec::new();

    for record in records {
        if record.match_status != MatchStatus::Unmatched || !record.is_match_target() {
            continue;
        }
        let hit = MatchRule::ALL.into_iter().find_map(|rule| {
            pool.iter()
                .position(|candidate| rule.accepts(record, candidate))
                .map(|idx| (rule, idx))
        });
        if let Some((rule, idx)) = hit {
            let candidate = pool.remove(idx);
            planned.push(PlannedMatch {
                transaction_id: record.id,
                expense_id: candidate.id,
                rule,
            });
        }
    }

    planned
}

/// Outcome of one auto-match run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub candidates: usize,
    pub planned: usize,
    pub committed: usize,
}

/// Auto-match a statement's unmatched records and persist the links.
///
/// Each link is written conditionally, so a record changed by a manual action
/// in the meantime keeps its new state.
pub async fn auto_match_statement(
    pool: &PgPool,
    statement_id: Uuid,
    period: StatementPeriod,
) -> Result<MatchSummary, sqlx::Error> {
    let records = transaction_queries::list_unmatched(pool, statement_id).await?;
    let (from, to) = period.widened(CANDIDATE_WINDOW_DAYS);
    let candidates = expense_queries::unlinked_paid_candidates(pool, from, to).await?;

    let planned = plan_matches(&records, &candidates);
    let mut committed = 0;
    for m in &planned {
        let linked = transaction_queries::commit_auto_match(
            pool,
            m.transaction_id,
            m.expense_id,
            m.rule.confidence(),
        )
        .await?;
        if linked {
            committed += 1;
        } else {
            tracing::debug!(
                transaction_id = %m.transaction_id,
                expense_id = %m.expense_id,
                "Planned match skipped, record or expense changed"
            );
        }
    }

    metrics::counter!("transactions_auto_matched_total").increment(committed as u64);
    tracing::info!(
        statement_id = %statement_id,
        unmatched = records.len(),
        candidates = candidates.len(),
        planned = planned.len(),
        committed,
        "Auto-match finished"
    );

    Ok(MatchSummary {
        candidates: candidates.len(),
        planned: planned.len(),
        committed,
    })
}

/// Rank candidates for manual review: equal amounts first, then vendor
/// similarity, then closeness of dates.
pub fn rank_suggestions(record: &TransactionRecord, candidates: &[ExpenseCandidate]) -> Vec<Suggestion> {
    let hint = if record.vendor_hint.trim().is_empty() {
        record.description.to_lowercase()
    } else {
        record.vendor_hint.to_lowercase()
    };

    let mut ranked: Vec<Suggestion> = candidates
        .iter()
        .map(|candidate| Suggestion {
            expense: candidate.clone(),
            amount_matches: candidate.amount_cents == record.amount_cents.abs(),
            vendor_similarity: strsim::jaro_winkler(&hint, &candidate.vendor_name.to_lowercase()),
            days_apart: (candidate.date_paid - record.posting_date).num_days().abs(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.amount_matches
            .cmp(&a.amount_matches)
            .then_with(|| {
                b.vendor_similarity
                    .partial_cmp(&a.vendor_similarity)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.days_apart.cmp(&b.days_apart))
    });
    ranked.truncate(MAX_SUGGESTIONS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::{Category, TransactionType};
    use chrono::{NaiveDate, Utc};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }

    fn record(amount_cents: i64, day: u32, vendor_hint: &str) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            statement_id: Uuid::nil(),
            position: 0,
            posting_date: date(day),
            description: "ACH DEBIT".to_string(),
            amount_cents,
            transaction_type: TransactionType::Debit,
            category: Category::Expense,
            check_number: None,
            vendor_hint: vendor_hint.to_string(),
            match_status: MatchStatus::Unmatched,
            match_confidence: MatchConfidence::None,
            matched_expense_id: None,
            matched_at: None,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    fn check(serial: &str, amount_cents: i64, day: u32) -> TransactionRecord {
        TransactionRecord {
            transaction_type: TransactionType::Check,
            category: Category::ExpenseCheck,
            check_number: Some(serial.to_string()),
            description: format!("Check #{serial}"),
            ..record(amount_cents, day, "")
        }
    }

    fn candidate(vendor: &str, amount_cents: i64, day: u32, check_number: Option<&str>) -> ExpenseCandidate {
        ExpenseCandidate {
            id: Uuid::new_v4(),
            vendor_name: vendor.to_string(),
            amount_cents,
            date_paid: date(day),
            check_number: check_number.map(str::to_string),
        }
    }

    #[test]
    fn test_check_number_wins_over_amount_and_date() {
        let rec = check("2730", -50_000, 1);
        let by_amount = candidate("Landlord", 50_000, 1, None);
        let by_check = candidate("Landlord", 49_000, 20, Some("2730"));

        let planned = plan_matches(&[rec.clone()], &[by_amount, by_check.clone()]);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].expense_id, by_check.id);
        assert_eq!(planned[0].rule, MatchRule::CheckNumber);
        assert_eq!(planned[0].rule.confidence(), MatchConfidence::AutoExact);
    }

    #[test]
    fn test_each_expense_used_once() {
        let a = record(-8_000, 2, "Verizon");
        let b = record(-8_000, 3, "Verizon");
        let only = candidate("Verizon Wireless", 8_000, 2, None);

        let planned = plan_matches(&[a.clone(), b], &[only.clone()]);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].transaction_id, a.id);
        assert_eq!(planned[0].expense_id, only.id);
    }

    #[test]
    fn test_amount_must_match_exactly() {
        let rec = record(-152_550, 2, "Jetro");
        let close = candidate("Jetro Cash & Carry", 152_551, 2, None);
        assert!(plan_matches(&[rec], &[close]).is_empty());
    }

    #[test]
    fn test_date_tolerance_then_vendor_fallback() {
        let rec = record(-12_000, 10, "Con Edison");
        let far_same_vendor = candidate("CON EDISON OF NY", 12_000, 16, None);
        let planned = plan_matches(&[rec.clone()], &[far_same_vendor]);
        assert_eq!(planned[0].rule, MatchRule::AmountAndVendor);

        let near_other_vendor = candidate("National Grid", 12_000, 13, None);
        let planned = plan_matches(&[rec], &[near_other_vendor]);
        assert_eq!(planned[0].rule, MatchRule::AmountAndDate);
    }

    #[test]
    fn test_inflows_fees_and_reviewed_records_are_skipped() {
        let mut deposit = record(5_000, 1, "");
        deposit.transaction_type = TransactionType::Deposit;
        let mut fee = record(-1_500, 31, "TD Bank");
        fee.transaction_type = TransactionType::Fee;
        let mut ignored = record(-5_000, 1, "");
        ignored.match_status = MatchStatus::Ignored;

        let pool = vec![
            candidate("Anything", 5_000, 1, None),
            candidate("TD Bank", 1_500, 31, None),
        ];
        assert!(plan_matches(&[deposit, fee, ignored], &pool).is_empty());
    }

    #[test]
    fn test_suggestions_ranked_and_capped() {
        let rec = record(-8_000, 10, "Verizon");
        let mut pool = vec![
            candidate("Verizon", 9_000, 10, None),
            candidate("Cintas", 8_000, 20, None),
            candidate("Verizon Wireless", 8_000, 12, None),
        ];
        for i in 0..12 {
            pool.push(candidate(&format!("Vendor {i}"), 100 + i, 1, None));
        }

        let ranked = rank_suggestions(&rec, &pool);
        assert_eq!(ranked.len(), MAX_SUGGESTIONS);
        assert_eq!(ranked[0].expense.vendor_name, "Verizon Wireless");
        assert_eq!(ranked[1].expense.vendor_name, "Cintas");
        assert_eq!(ranked[2].expense.vendor_name, "Verizon");
        assert!(ranked[0].amount_matches);
        assert_eq!(ranked[0].days_apart, 2);
    }
}
