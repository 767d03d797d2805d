use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use statement_recon::models::statement::StatementPeriod;
use statement_recon::models::transaction::format_cents;
use statement_recon::services::extractor::PdfToText;
use statement_recon::services::parser::StatementParser;

/// Run text extraction and the statement parser on one file and print what was found.
#[derive(Parser, Debug)]
#[command(name = "parse_check", version, about = "Offline statement parser diagnostics")]
struct Cli {
    /// Statement PDF, or a `.txt` file of already extracted text
    file: PathBuf,

    /// Reference period (YYYY-MM) used when the text has no statement period line
    #[arg(long)]
    period: Option<StatementPeriod>,

    /// pdftotext executable
    #[arg(long, default_value = "pdftotext")]
    pdftotext: String,

    /// Print records as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if !cli.file.exists() {
        bail!("file not found: {}", cli.file.display());
    }

    let parser = StatementParser::new(Arc::new(PdfToText::new(cli.pdftotext)));
    let parsed = parser
        .parse_file(&cli.file, cli.period)
        .await
        .with_context(|| format!("failed to parse {}", cli.file.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&parsed.transactions)?);
        return Ok(());
    }

    println!("Period:            {}", parsed.period.label());
    println!("Account:           ...{}", parsed.account_last_four);
    println!("Beginning balance: {}", format_cents(parsed.beginning_balance_cents));
    println!("Ending balance:    {}", format_cents(parsed.ending_balance_cents));
    println!();

    let mut by_type: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    for record in &parsed.transactions {
        let entry = by_type.entry(record.transaction_type.to_string()).or_default();
        entry.0 += 1;
        entry.1 += record.amount_cents;
    }
    println!("{:<10} {:>6} {:>14}", "TYPE", "COUNT", "TOTAL");
    for (kind, (count, total)) in &by_type {
        println!("{:<10} {:>6} {:>14}", kind, count, format_cents(*total));
    }
    println!();

    println!(
        "{:<10} {:<10} {:>12} {:<14} {:<8} {:<20} DESCRIPTION",
        "DATE", "TYPE", "AMOUNT", "CATEGORY", "CHECK", "VENDOR"
    );
    for record in &parsed.transactions {
        println!(
            "{:<10} {:<10} {:>12} {:<14} {:<8} {:<20} {}",
            record.posting_date,
            record.transaction_type.to_string(),
            format_cents(record.amount_cents),
            record.category.to_string(),
            record.check_number.as_deref().unwrap_or("-"),
            record.vendor_hint,
            record.description,
        );
    }
    println!();

    let verification = parsed.verification();
    println!("{:<22} {:>12} {:>12} {:>10}", "SECTION", "DECLARED", "PARSED", "DELTA");
    for check in &verification.subtotals {
        println!(
            "{:<22} {:>12} {:>12} {:>10}",
            check.section.title(),
            check.declared_cents.map(format_cents).unwrap_or_else(|| "-".to_string()),
            format_cents(check.computed_cents),
            check.delta_cents.map(format_cents).unwrap_or_else(|| "-".to_string()),
        );
    }
    println!();
    println!(
        "Balance check: beginning + records - ending = {}",
        format_cents(verification.balance_delta_cents)
    );

    if verification.is_clean() {
        println!("OK: every total reconciles");
    } else {
        println!("MISMATCH: parsed records do not reproduce the statement's totals");
    }

    Ok(())
}
