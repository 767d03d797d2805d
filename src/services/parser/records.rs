//! Record extraction for the three table layouts.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::enrich::{categorize, extract_vendor_hint, BANK_NAME};
use super::sections::Section;
use super::{parse_cents, ParseContext};
use crate::models::transaction::{Category, NewTransactionRecord, TransactionType};

/// `MM/DD  DESCRIPTION  AMOUNT` with at least two spaces before the amount.
fn record_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{2}/\d{2})\s+(.+?)\s{2,}([\d,]+\.\d{2})\s*$").expect("record line regex")
    })
}

/// A new record starts with its date in the first column.
fn dated_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}\s").expect("dated line regex"))
}

fn continuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s{6,}(\S.*)$").expect("continuation regex"))
}

/// Card and account numbers printed on their own line.
fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{12,}$").expect("digit run regex"))
}

/// One check entry; a line can hold two of them side by side.
fn check_entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{2}/\d{2})\s+(\d+)\*?\s+([\d,]+\.\d{2})").expect("check entry regex")
    })
}

fn build_record(
    ctx: &ParseContext,
    section: Section,
    mmdd: &str,
    description: String,
    amount: &str,
) -> Option<NewTransactionRecord> {
    let posting_date = ctx.posting_date(mmdd)?;
    let transaction_type = section.transaction_type();
    let amount_cents = transaction_type.signed(parse_cents(amount)?);
    let category = categorize(transaction_type, &description, amount_cents);
    let vendor_hint = if transaction_type == TransactionType::Fee {
        BANK_NAME.to_string()
    } else {
        extract_vendor_hint(&description)
    };

    Some(NewTransactionRecord {
        posting_date,
        description,
        amount_cents,
        transaction_type,
        category,
        check_number: None,
        vendor_hint,
    })
}

/// Deposits, other credits and service charges: one line per record.
pub(super) fn parse_single_line(
    ctx: &ParseContext,
    section: Section,
    lines: &[String],
) -> Vec<NewTransactionRecord> {
    lines
        .iter()
        .filter_map(|line| {
            let caps = record_line_re().captures(line.trim())?;
            build_record(ctx, section, &caps[1], caps[2].trim().to_string(), &caps[3])
        })
        .collect()
}

struct OpenRecord<'a> {
    mmdd: &'a str,
    description: String,
    amount: &'a str,
}

impl OpenRecord<'_> {
    fn finish(self, ctx: &ParseContext, section: Section) -> Option<NewTransactionRecord> {
        build_record(ctx, section, self.mmdd, self.description, self.amount)
    }
}

/// Electronic payments and other withdrawals: a dated line plus indented
/// continuation lines.
pub(super) fn parse_multi_line(
    ctx: &ParseContext,
    section: Section,
    lines: &[String],
) -> Vec<NewTransactionRecord> {
    let mut records = Vec::new();
    let mut open: Option<OpenRecord<'_>> = None;

    for line in lines {
        if dated_line_re().is_match(line) {
            // A dated line that is not a full record still ends the previous one.
            records.extend(open.take().and_then(|rec| rec.finish(ctx, section)));
            if let Some(caps) = record_line_re().captures(line.trim()) {
                if let (Some(mmdd), Some(desc), Some(amount)) = (caps.get(1), caps.get(2), caps.get(3)) {
                    open = Some(OpenRecord {
                        mmdd: mmdd.as_str(),
                        description: desc.as_str().trim().to_string(),
                        amount: amount.as_str(),
                    });
                }
            }
            continue;
        }

        let Some(rec) = open.as_mut() else { continue };
        let Some(caps) = continuation_re().captures(line) else {
            continue;
        };
        let text = caps[1].trim();
        if digit_run_re().is_match(text) {
            continue;
        }
        rec.description.push(' ');
        rec.description.push_str(text);
    }
    records.extend(open.and_then(|rec| rec.finish(ctx, section)));

    records
}

/// Checks paid: two visual columns read row by row. A serial number is kept
/// once, at its first occurrence.
pub(super) fn parse_checks(ctx: &ParseContext, lines: &[String]) -> Vec<NewTransactionRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for line in lines {
        for caps in check_entry_re().captures_iter(line) {
            let serial = caps[2].to_string();
            if seen.contains(&serial) {
                tracing::debug!(serial = %serial, "Duplicate check serial skipped");
                continue;
            }
            let Some(posting_date) = ctx.posting_date(&caps[1]) else {
                continue;
            };
            let Some(cents) = parse_cents(&caps[3]) else {
                continue;
            };
            seen.insert(serial.clone());
            records.push(NewTransactionRecord {
                posting_date,
                description: format!("Check #{serial}"),
                amount_cents: TransactionType::Check.signed(cents),
                transaction_type: TransactionType::Check,
                category: Category::ExpenseCheck,
                check_number: Some(serial),
                vendor_hint: String::new(),
            });
        }
    }

    records
}
