//! Heuristic category and vendor tagging of parsed descriptions.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::transaction::{Category, TransactionType};

/// Vendor hint attached to every service charge.
pub const BANK_NAME: &str = "TD Bank";

/// Known vendors, tried in order. The first pattern that matches names the vendor.
const KNOWN_VENDORS: &[(&str, &str)] = &[
    ("Jetro", r"JETRO"),
    ("Chef's Choice", r"CHEF.?S?\s*CHOICE"),
    ("Cogent Waste", r"COGENT\s*WASTE"),
    ("Con Edison", r"CON\s*ED"),
    ("National Grid", r"NGRID|NATIONAL\s*GRID"),
    ("Uber Eats", r"UBER"),
    ("Grubhub", r"GRUBHUB"),
    ("DoorDash", r"DOORDASH"),
    ("Verizon", r"VERIZON"),
    ("AT&T", r"\bATT\s|AT&T"),
    ("Sampar's", r"SAMPARS?"),
    ("Clover", r"CLOVER"),
    ("Cintas", r"CINTAS"),
    ("Dish Network", r"DISH\s*NETWORK"),
    ("Bankcard", r"BANKCARD\s*MTOT"),
    ("Gobwa Exotic", r"GOBWA\s*EXOTIC"),
    ("Caribbean Depot", r"CARIBBEAN\s*DEPOT"),
    ("C&S Meats", r"C\s*AND\s*S\s*MEATS"),
    ("Good Food", r"GOOD\s*FOOD\s*FOR\s*LESS"),
    ("INP Foods", r"INP\s*FOODS"),
    ("Wegmans", r"WEGMANS"),
];

/// Leading tokens of card and ACH descriptors that never name a merchant.
const PREFIX_TOKENS: &[&str] = &[
    "DBCRD", "DEBIT", "POS", "AP", "AUT", "VISA", "DDA", "PUR", "PURCHASE",
];

fn known_vendors() -> &'static [(&'static str, Regex)] {
    static VENDORS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    VENDORS.get_or_init(|| {
        KNOWN_VENDORS
            .iter()
            .map(|(name, pattern)| {
                let re = Regex::new(&format!("(?i){pattern}")).expect("vendor regex");
                (*name, re)
            })
            .collect()
    })
}

/// `MERCHANT NAME  CITY * ST` as printed by card processors.
fn merchant_location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Z][A-Z0-9\s&']+?)\s+(?:[A-Z]+\s+)?\*\s*[A-Z]{2}")
            .expect("merchant location regex")
    })
}

fn strip_prefix_tokens(name: &str) -> String {
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    while let Some(first) = tokens.first() {
        let is_prefix = PREFIX_TOKENS.contains(first)
            || first.chars().all(|c| c.is_ascii_digit());
        if !is_prefix {
            break;
        }
        tokens.remove(0);
    }
    tokens.join(" ")
}

/// Best-effort vendor name for a description, or an empty string.
pub fn extract_vendor_hint(description: &str) -> String {
    if let Some((name, _)) = known_vendors().iter().find(|(_, re)| re.is_match(description)) {
        return (*name).to_string();
    }

    let Some(caps) = merchant_location_re().captures(description) else {
        return String::new();
    };
    let hint = strip_prefix_tokens(&caps[1]);
    if hint.chars().count() > 3 {
        hint
    } else {
        String::new()
    }
}

/// Category for a record. Positive amounts use the income rules, everything
/// else the spending rules.
pub fn categorize(transaction_type: TransactionType, description: &str, amount_cents: i64) -> Category {
    let upper = description.to_uppercase();
    let has = |needle: &str| upper.contains(needle);

    let inflow = amount_cents > 0 || (amount_cents == 0 && transaction_type.is_inflow());
    if inflow {
        if has("BANKCARD") || has("MTOT DEP") {
            Category::IncomeCards
        } else if has("UBER") || has("GRUBHUB") || has("DOORDASH") {
            Category::IncomeDelivery
        } else if has("REFUND") || has("OD GRACE") {
            Category::Refund
        } else {
            Category::IncomeOther
        }
    } else if transaction_type == TransactionType::Check {
        Category::ExpenseCheck
    } else if transaction_type == TransactionType::Fee || has("OVERDRAFT") {
        Category::Fee
    } else if has("TRANSFER") || has("XFER") {
        Category::Transfer
    } else if has("ATM") {
        Category::Atm
    } else {
        Category::Expense
    }
}
