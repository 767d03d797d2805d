//! Bank statement parser.
//!
//! Turns layout-preserved statement text into header fields and an ordered
//! list of transaction records. Parsing is deterministic: the same text always
//! yields the same records in the same order (section order, then line order).
//! Lines that do not fit their section's pattern are skipped; only a missing
//! reference period fails the parse.

mod enrich;
mod records;
mod sections;

pub use enrich::{categorize, extract_vendor_hint, BANK_NAME};
pub use sections::Section;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::models::statement::{DeclaredSubtotals, StatementPeriod};
use crate::models::transaction::NewTransactionRecord;
use crate::services::extractor::{ExtractError, TextExtractor};
use sections::Layout;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("text extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("no statement period found in document and no fallback period given")]
    MissingPeriod,
}

/// Reference month for resolving `MM/DD` posting dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    pub period: StatementPeriod,
}

impl ParseContext {
    pub fn new(period: StatementPeriod) -> Self {
        Self { period }
    }

    /// Full posting date for an `MM/DD` string.
    ///
    /// A January record on a December statement belongs to the next year, a
    /// December record on a January statement to the previous one. Impossible
    /// dates yield `None`.
    pub fn posting_date(&self, mmdd: &str) -> Option<NaiveDate> {
        let (month, day) = mmdd.trim().split_once('/')?;
        let month: u32 = month.parse().ok()?;
        let day: u32 = day.parse().ok()?;

        let year = match (month, self.period.month) {
            (1, 12) => self.period.year + 1,
            (12, 1) => self.period.year - 1,
            _ => self.period.year,
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Parse a money string such as `$1,525.50` or `-12.00` into cents.
pub fn parse_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let (whole, frac) = digits.split_once('.')?;
    if whole.is_empty()
        || frac.len() != 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let cents = whole.parse::<i64>().ok()?.checked_mul(100)?.checked_add(frac.parse::<i64>().ok()?)?;
    Some(if negative { -cents } else { cents })
}

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Statement Period:\s+(\w+)\s+\d+\s+(\d{4})").expect("period regex"))
}

fn account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Account\s*#[:\s]+[\d-]*(\d{4})").expect("account regex"))
}

fn beginning_balance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Beginning\s+Balance\s+\$?(-?[\d,]+\.\d{2})").expect("beginning balance regex")
    })
}

fn ending_balance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Ending\s+Balance\s+\$?(-?[\d,]+\.\d{2})").expect("ending balance regex")
    })
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    MONTHS.iter().position(|m| *m == prefix).map(|idx| idx as u32 + 1)
}

/// Header fields found on the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementHeader {
    pub period: Option<StatementPeriod>,
    pub account_last_four: String,
    pub beginning_balance_cents: i64,
    pub ending_balance_cents: i64,
}

pub fn parse_header(text: &str) -> StatementHeader {
    let period = period_re().captures(text).and_then(|caps| {
        let month = month_from_name(&caps[1])?;
        let year: i32 = caps[2].parse().ok()?;
        StatementPeriod::new(year, month)
    });
    let account_last_four = account_re()
        .captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();
    let money = |re: &Regex| {
        re.captures(text)
            .and_then(|caps| parse_cents(&caps[1]))
            .unwrap_or(0)
    };

    StatementHeader {
        period,
        account_last_four,
        beginning_balance_cents: money(beginning_balance_re()),
        ending_balance_cents: money(ending_balance_re()),
    }
}

/// Declared against computed total for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtotalCheck {
    pub section: Section,
    pub declared_cents: Option<i64>,
    pub computed_cents: i64,
    /// `computed - declared`, when the statement printed a subtotal.
    pub delta_cents: Option<i64>,
}

/// Diagnostic comparison of parsed records with the statement's own totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub subtotals: Vec<SubtotalCheck>,
    /// `beginning + sum(amounts) - ending`; zero when every record was found.
    pub balance_delta_cents: i64,
}

impl Verification {
    pub fn is_clean(&self) -> bool {
        self.balance_delta_cents == 0
            && self
                .subtotals
                .iter()
                .all(|check| check.delta_cents.unwrap_or(0) == 0)
    }
}

/// Everything extracted from one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    pub period: StatementPeriod,
    pub account_last_four: String,
    pub beginning_balance_cents: i64,
    pub ending_balance_cents: i64,
    /// `Subtotal:` values keyed by the section that printed them.
    pub declared: BTreeMap<Section, i64>,
    pub transactions: Vec<NewTransactionRecord>,
}

impl ParsedStatement {
    /// The four declared totals kept on the statement row.
    pub fn declared_subtotals(&self) -> DeclaredSubtotals {
        let get = |section: Section| self.declared.get(&section).copied().unwrap_or(0);
        DeclaredSubtotals {
            deposits_cents: get(Section::Deposits),
            payments_cents: get(Section::ElectronicPayments),
            checks_cents: get(Section::ChecksPaid),
            fees_cents: get(Section::ServiceCharges),
        }
    }

    pub fn verification(&self) -> Verification {
        let subtotals = Section::ALL
            .into_iter()
            .map(|section| {
                let computed_cents: i64 = self
                    .transactions
                    .iter()
                    .filter(|t| t.transaction_type == section.transaction_type())
                    .map(|t| t.amount_cents.abs())
                    .sum();
                let declared_cents = self.declared.get(&section).copied();
                SubtotalCheck {
                    section,
                    declared_cents,
                    computed_cents,
                    delta_cents: declared_cents.map(|d| computed_cents - d),
                }
            })
            .collect();

        let net: i64 = self.transactions.iter().map(|t| t.amount_cents).sum();
        Verification {
            subtotals,
            balance_delta_cents: self.beginning_balance_cents + net - self.ending_balance_cents,
        }
    }
}

/// Parse extracted statement text.
///
/// `fallback` supplies the reference period when the text carries no
/// recognisable `Statement Period:` line.
pub fn parse_text(text: &str, fallback: Option<StatementPeriod>) -> Result<ParsedStatement, ParseError> {
    let text = sections::truncate_trailing_imagery(text);
    let header = parse_header(text);

    let period = match (header.period, fallback) {
        (Some(found), Some(expected)) if found != expected => {
            tracing::warn!(
                found = %found,
                expected = %expected,
                "Statement period differs from the document's period, using the printed one"
            );
            found
        }
        (Some(found), _) => found,
        (None, Some(expected)) => expected,
        (None, None) => return Err(ParseError::MissingPeriod),
    };
    let ctx = ParseContext::new(period);

    let bodies = sections::split_sections(text);
    let mut transactions = Vec::new();
    let mut declared = BTreeMap::new();

    for section in Section::ALL {
        let Some(body) = bodies.get(&section) else {
            continue;
        };
        if let Some(subtotal) = body.declared_subtotal {
            declared.insert(section, subtotal);
        }
        let parsed = match section.layout() {
            Layout::SingleLine => records::parse_single_line(&ctx, section, &body.lines),
            Layout::MultiLine => records::parse_multi_line(&ctx, section, &body.lines),
            Layout::CheckTable => records::parse_checks(&ctx, &body.lines),
        };
        tracing::debug!(section = section.title(), records = parsed.len(), "Section parsed");
        transactions.extend(parsed);
    }

    Ok(ParsedStatement {
        period,
        account_last_four: header.account_last_four,
        beginning_balance_cents: header.beginning_balance_cents,
        ending_balance_cents: header.ending_balance_cents,
        declared,
        transactions,
    })
}

/// Extraction followed by parsing.
#[derive(Clone)]
pub struct StatementParser {
    extractor: Arc<dyn TextExtractor>,
}

impl StatementParser {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn parse_file(
        &self,
        path: &Path,
        fallback: Option<StatementPeriod>,
    ) -> Result<ParsedStatement, ParseError> {
        let text = self.extractor.extract(path).await?;
        parse_text(&text, fallback)
    }
}
