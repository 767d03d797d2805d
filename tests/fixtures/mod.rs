//! Statement fixtures shared by the parser, integration and E2E tests.
#![allow(dead_code)]

/// Text of a December 2025 statement as `pdftotext -layout` prints it.
///
/// The electronic payments table breaks across a page, the check table
/// repeats serial 2730, one deposit posts in January, and a check image
/// page follows the daily balance summary.
pub const DECEMBER_2025: &str = r"                                     STATEMENT OF ACCOUNT

    CORNER KITCHEN LLC                                   Page:                 1 of 3
    123 MAIN ST                                          Statement Period: Dec 01 2025-Dec 31 2025
    BROOKLYN NY 11225                                    Cust Ref #:        4321000000-039-T-###
                                                         Primary Account #: 432-1005678

ACCOUNT SUMMARY
Beginning Balance                 10,000.00          Average Collected Balance      9,100.00
Electronic Deposits                1,884.56          Interest Earned This Period        0.00
Other Credits                         35.00
Checks Paid                          875.25
Electronic Payments                1,709.87
Other Withdrawals                  1,200.00
Service Charges                       15.00
Ending Balance                     8,119.44

DAILY ACCOUNT ACTIVITY
Electronic Deposits
POSTING DATE     DESCRIPTION                                                    AMOUNT
12/01            CCD DEPOSIT, BANKCARD MTOT DEP 518                           1,234.56
12/03            CCD DEPOSIT, UBER USA 6787 PAYMENTS                            450.00
01/02            CCD DEPOSIT, GRUBHUB INC                                       200.00
                                                            Subtotal:         1,884.56

Other Credits
POSTING DATE     DESCRIPTION                                                    AMOUNT
12/10            OD GRACE REFUND                                                 35.00
                                                            Subtotal:            35.00

Checks Paid
No. Checks: 3      *Indicates break in serial sequence or check processed electronically
DATE      SERIAL NO.         AMOUNT          DATE      SERIAL NO.         AMOUNT
12/01     2730               500.00          12/04     2731*              250.00
12/03     2733               125.25          12/01     2730               500.00
                                                            Subtotal:           875.25

Electronic Payments
POSTING DATE     DESCRIPTION                                                    AMOUNT
12/02            DEBIT POS AP, AUT 120225 DDA PURCHASE AP                     1,525.50
                 JETRO CASH CARRY   BROOKLYN  * NY
                 4085404036441234
12/05            ACH DEBIT, CON ED OF NY                                        120.00
                 INTELL CK 1234

Call 1-800-937-2000 for 24-hour Bank-by-Phone services or connect to www.tdbank.com
Bank Deposits FDIC Insured | TD Bank, N.A. | Equal Housing Lender
                                     STATEMENT OF ACCOUNT

    CORNER KITCHEN LLC                                   Page:                 2 of 3
                                                         Statement Period: Dec 01 2025-Dec 31 2025
                                                         Primary Account #: 432-1005678

DAILY ACCOUNT ACTIVITY
Electronic Payments (continued)
POSTING DATE     DESCRIPTION                                                    AMOUNT
12/09            DEBIT POS AP, AUT 120825 DDA PURCHASE AP                        64.37
                 KEY FOOD   BROOKLYN  * NY
                 4085404036441234
                                                            Subtotal:         1,709.87

Other Withdrawals
POSTING DATE     DESCRIPTION                                                    AMOUNT
12/15            ATM WITHDRAWAL, 1234 FLATBUSH AVE                              200.00
12/20            ONLINE TRANSFER TO SAV 9876                                  1,000.00
                                                            Subtotal:         1,200.00

Service Charges
POSTING DATE     DESCRIPTION                                                    AMOUNT
12/31            MAINTENANCE FEE                                                 15.00
                                                            Subtotal:            15.00

DAILY BALANCE SUMMARY
DATE                BALANCE           DATE                BALANCE
12/01              10,734.56          12/15               8,609.44
12/31               8,119.44

Call 1-800-937-2000 for 24-hour Bank-by-Phone services or connect to www.tdbank.com
Checks Paid
DATE      SERIAL NO.         AMOUNT
12/01     9999               999.00
#2730   12/01   $500.00                       #2731   12/04   $250.00
";

/// Expected shape of one parsed record.
#[derive(Debug, Clone)]
pub struct ExpectedRecord {
    pub date: &'static str,
    pub transaction_type: &'static str,
    pub amount_cents: i64,
    pub category: &'static str,
    pub check_number: Option<&'static str>,
    pub vendor_hint: &'static str,
}

/// Records of [`DECEMBER_2025`] in parse order.
pub const DECEMBER_2025_RECORDS: &[ExpectedRecord] = &[
    ExpectedRecord { date: "2025-12-01", transaction_type: "deposit", amount_cents: 123_456, category: "income_cards", check_number: None, vendor_hint: "Bankcard" },
    ExpectedRecord { date: "2025-12-03", transaction_type: "deposit", amount_cents: 45_000, category: "income_delivery", check_number: None, vendor_hint: "Uber Eats" },
    ExpectedRecord { date: "2026-01-02", transaction_type: "deposit", amount_cents: 20_000, category: "income_delivery", check_number: None, vendor_hint: "Grubhub" },
    ExpectedRecord { date: "2025-12-10", transaction_type: "credit", amount_cents: 3_500, category: "refund", check_number: None, vendor_hint: "" },
    ExpectedRecord { date: "2025-12-01", transaction_type: "check", amount_cents: -50_000, category: "expense_check", check_number: Some("2730"), vendor_hint: "" },
    ExpectedRecord { date: "2025-12-04", transaction_type: "check", amount_cents: -25_000, category: "expense_check", check_number: Some("2731"), vendor_hint: "" },
    ExpectedRecord { date: "2025-12-03", transaction_type: "check", amount_cents: -12_525, category: "expense_check", check_number: Some("2733"), vendor_hint: "" },
    ExpectedRecord { date: "2025-12-02", transaction_type: "debit", amount_cents: -152_550, category: "expense", check_number: None, vendor_hint: "Jetro" },
    ExpectedRecord { date: "2025-12-05", transaction_type: "debit", amount_cents: -12_000, category: "expense", check_number: None, vendor_hint: "Con Edison" },
    ExpectedRecord { date: "2025-12-09", transaction_type: "debit", amount_cents: -6_437, category: "expense", check_number: None, vendor_hint: "KEY FOOD" },
    ExpectedRecord { date: "2025-12-15", transaction_type: "withdrawal", amount_cents: -20_000, category: "atm", check_number: None, vendor_hint: "" },
    ExpectedRecord { date: "2025-12-20", transaction_type: "withdrawal", amount_cents: -100_000, category: "transfer", check_number: None, vendor_hint: "" },
    ExpectedRecord { date: "2025-12-31", transaction_type: "fee", amount_cents: -1_500, category: "fee", check_number: None, vendor_hint: "TD Bank" },
];

pub const DECEMBER_2025_BEGINNING_CENTS: i64 = 1_000_000;
pub const DECEMBER_2025_ENDING_CENTS: i64 = 811_944;
