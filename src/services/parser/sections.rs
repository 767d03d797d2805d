//! Locating the transaction tables inside layout-preserved statement text.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use super::parse_cents;
use crate::models::transaction::TransactionType;

pub(super) const BALANCE_SUMMARY: &str = "DAILY BALANCE SUMMARY";
const PAGE_FOOTER: &str = "Call 1-800-937-2000";

/// Lines that mark a page boundary. A section chunk never runs past one.
const PAGE_MARKERS: &[&str] = &[
    PAGE_FOOTER,
    "Bank Deposits FDIC Insured",
    "STATEMENT OF ACCOUNT",
    "Page:",
    "Statement Period:",
    "DAILY ACCOUNT ACTIVITY",
];

/// Lines dropped from a section body before record parsing.
const NOISE_MARKERS: &[&str] = &["xxxxxx", "POSTING DATE", "SERIAL NO"];

/// Column header lookahead after a section name, in non-blank lines.
const COLUMN_HEADER_WINDOW: usize = 3;

/// The six transaction tables of a statement, in extraction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Deposits,
    OtherCredits,
    ChecksPaid,
    ElectronicPayments,
    OtherWithdrawals,
    ServiceCharges,
}

/// How records are laid out inside a section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Layout {
    SingleLine,
    MultiLine,
    CheckTable,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Deposits,
        Section::OtherCredits,
        Section::ChecksPaid,
        Section::ElectronicPayments,
        Section::OtherWithdrawals,
        Section::ServiceCharges,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Deposits => "Electronic Deposits",
            Section::OtherCredits => "Other Credits",
            Section::ChecksPaid => "Checks Paid",
            Section::ElectronicPayments => "Electronic Payments",
            Section::OtherWithdrawals => "Other Withdrawals",
            Section::ServiceCharges => "Service Charges",
        }
    }

    pub fn transaction_type(self) -> TransactionType {
        match self {
            Section::Deposits => TransactionType::Deposit,
            Section::OtherCredits => TransactionType::Credit,
            Section::ChecksPaid => TransactionType::Check,
            Section::ElectronicPayments => TransactionType::Debit,
            Section::OtherWithdrawals => TransactionType::Withdrawal,
            Section::ServiceCharges => TransactionType::Fee,
        }
    }

    pub(super) fn layout(self) -> Layout {
        match self {
            Section::Deposits | Section::OtherCredits | Section::ServiceCharges => {
                Layout::SingleLine
            }
            Section::ElectronicPayments | Section::OtherWithdrawals => Layout::MultiLine,
            Section::ChecksPaid => Layout::CheckTable,
        }
    }

    fn column_marker(self) -> &'static str {
        match self {
            Section::ChecksPaid => "SERIAL NO",
            _ => "POSTING DATE",
        }
    }

    fn from_title(title: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.title() == title)
    }
}

/// Concatenated body of every table occurrence of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct SectionBody {
    pub lines: Vec<String>,
    /// The `Subtotal:` printed at the end of the section, if any.
    pub declared_subtotal: Option<i64>,
}

fn section_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(Electronic Deposits|Other Credits|Checks Paid|Electronic Payments|",
            r"Other Withdrawals|Service Charges)(?:\s*\(continued\))?(?:\s{2,}.*)?\s*$"
        ))
        .expect("section header regex")
    })
}

fn subtotal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Subtotal:\s*\$?(-?[\d,]+\.\d{2})").expect("subtotal regex"))
}

/// Drop the check-image pages that follow the balance summary.
pub(super) fn truncate_trailing_imagery(text: &str) -> &str {
    let Some(summary_idx) = text.rfind(BALANCE_SUMMARY) else {
        return text;
    };
    match text[summary_idx..].find(PAGE_FOOTER) {
        Some(footer_idx) => &text[..summary_idx + footer_idx],
        None => text,
    }
}

#[derive(Debug, Clone, Copy)]
struct TableStart {
    header_line: usize,
    section: Section,
    body_line: usize,
}

fn section_header(line: &str) -> Option<Section> {
    let caps = section_header_re().captures(line)?;
    Section::from_title(caps.get(1)?.as_str())
}

/// Index of the section's column header line, if it follows the name closely.
fn column_header_after(lines: &[&str], header_line: usize, section: Section) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(header_line + 1)
        .filter(|(_, line)| !line.trim().is_empty())
        .take(COLUMN_HEADER_WINDOW)
        .take_while(|(_, line)| section_header(line).is_none())
        .find(|(_, line)| line.contains(section.column_marker()))
        .map(|(idx, _)| idx)
}

fn find_table_starts(lines: &[&str]) -> Vec<TableStart> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let section = section_header(line)?;
            let column_line = column_header_after(lines, idx, section)?;
            Some(TableStart {
                header_line: idx,
                section,
                body_line: column_line + 1,
            })
        })
        .collect()
}

fn is_page_boundary(line: &str) -> bool {
    line.contains(BALANCE_SUMMARY) || PAGE_MARKERS.iter().any(|m| line.contains(m))
}

/// Remove footers, repeated column headers and near-empty lines.
pub(super) fn strip_noise<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    lines
        .into_iter()
        .filter(|line| line.trim().chars().count() >= 3)
        .filter(|line| !PAGE_MARKERS.iter().chain(NOISE_MARKERS).any(|m| line.contains(m)))
        .map(str::to_string)
        .collect()
}

/// Split the statement into section bodies keyed by section.
///
/// A table is recognised by its name at the start of a line followed by the
/// column header; every occurrence of the same section is appended in order.
/// Each chunk stops at the next table, its `Subtotal:` line, or a page boundary.
pub(super) fn split_sections(text: &str) -> BTreeMap<Section, SectionBody> {
    let lines: Vec<&str> = text.lines().collect();
    let starts = find_table_starts(&lines);
    let header_lines: HashSet<usize> = starts.iter().map(|s| s.header_line).collect();

    let mut bodies: BTreeMap<Section, SectionBody> = BTreeMap::new();
    for start in &starts {
        let mut chunk = Vec::new();
        let mut subtotal = None;

        for (idx, line) in lines.iter().enumerate().skip(start.body_line) {
            if header_lines.contains(&idx) {
                break;
            }
            if line.trim_start().starts_with("Subtotal:") {
                subtotal = subtotal_re()
                    .captures(line)
                    .and_then(|caps| parse_cents(&caps[1]));
                break;
            }
            if is_page_boundary(line) {
                break;
            }
            chunk.push(*line);
        }

        let body = bodies.entry(start.section).or_default();
        body.lines.extend(strip_noise(chunk));
        if subtotal.is_some() {
            body.declared_subtotal = subtotal;
        }
    }

    for (section, body) in &bodies {
        tracing::debug!(
            section = section.title(),
            lines = body.lines.len(),
            declared_subtotal = ?body.declared_subtotal,
            "Section segmented"
        );
    }

    bodies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_drops_check_images() {
        let text = "head\nDAILY BALANCE SUMMARY\n12/01  100.00\nCall 1-800-937-2000 for help\n#2730  12/01  $500.00\n";
        let truncated = truncate_trailing_imagery(text);
        assert!(truncated.ends_with("12/01  100.00\n"));
        assert!(!truncated.contains("#2730"));
    }

    #[test]
    fn test_truncate_without_summary_keeps_text() {
        let text = "no summary here\nCall 1-800-937-2000\n";
        assert_eq!(truncate_trailing_imagery(text), text);
    }

    #[test]
    fn test_bare_section_name_is_not_a_table() {
        let text = concat!(
            "ACCOUNT SUMMARY\n",
            "Electronic Deposits                25,000.00\n",
            "Checks Paid\n",
            "Beginning Balance                  1.00\n",
            "\n",
            "Electronic Deposits\n",
            "POSTING DATE     DESCRIPTION                    AMOUNT\n",
            "12/01            CCD DEPOSIT, BANKCARD MTOT DEP     1,234.56\n",
            "                                 Subtotal:          1,234.56\n",
        );
        let bodies = split_sections(text);
        assert!(!bodies.contains_key(&Section::ChecksPaid));
        let deposits = &bodies[&Section::Deposits];
        assert_eq!(deposits.lines.len(), 1);
        assert_eq!(deposits.declared_subtotal, Some(123_456));
    }

    #[test]
    fn test_checks_header_with_trailing_text() {
        let text = concat!(
            "Checks Paid         No. Checks: 1      *Indicates break in serial sequence\n",
            "DATE      SERIAL NO.         AMOUNT\n",
            "12/01     2730               500.00\n",
            "                                 Subtotal:            500.00\n",
        );
        let bodies = split_sections(text);
        let checks = &bodies[&Section::ChecksPaid];
        assert_eq!(checks.lines, vec!["12/01     2730               500.00".to_string()]);
        assert_eq!(checks.declared_subtotal, Some(50_000));
    }

    #[test]
    fn test_summary_line_with_amount_is_not_a_table() {
        let text = concat!(
            "Checks Paid                          875.25\n",
            "Electronic Payments                1,709.87\n",
            "Ending Balance                     8,119.44\n",
        );
        assert!(split_sections(text).is_empty());
    }

    #[test]
    fn test_continued_sections_are_concatenated() {
        let text = concat!(
            "Electronic Payments\n",
            "POSTING DATE     DESCRIPTION                    AMOUNT\n",
            "12/02            ACH DEBIT, CON ED OF NY            120.00\n",
            "Call 1-800-937-2000 for 24-hour Bank-by-Phone services\n",
            "STATEMENT OF ACCOUNT\n",
            "Electronic Payments (continued)\n",
            "POSTING DATE     DESCRIPTION                    AMOUNT\n",
            "12/05            ACH DEBIT, VERIZON                  80.00\n",
            "                                 Subtotal:            200.00\n",
        );
        let bodies = split_sections(text);
        let payments = &bodies[&Section::ElectronicPayments];
        assert_eq!(payments.lines.len(), 2);
        assert!(payments.lines[1].contains("VERIZON"));
        assert_eq!(payments.declared_subtotal, Some(20_000));
    }

    #[test]
    fn test_strip_noise() {
        let lines = vec![
            "12/01   DEPOSIT   10.00",
            "  ",
            "ab",
            "POSTING DATE   DESCRIPTION   AMOUNT",
            "xxxxxx1234",
            "Page: 2 of 9",
        ];
        assert_eq!(strip_noise(lines), vec!["12/01   DEPOSIT   10.00".to_string()]);
    }
}
