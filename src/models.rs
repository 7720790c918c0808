use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{CardbookError, Result};

pub const DEFAULT_TAG_COLOR: &str = "#007bff";

pub const MAX_BANK_NAME: usize = 100;
pub const MAX_CARD_NUMBER: usize = 20;
pub const MAX_TAG_NAME: usize = 50;
pub const MAX_PURPOSE: usize = 200;
pub const MAX_DEPOSITOR: usize = 100;

/// 15 significant digits with 2 of them after the point.
const MAX_INTEGER_DIGITS: u32 = 13;

/// Largest balance a card may hold, in cents: 9,999,999,999,999.99.
pub const MAX_BALANCE_CENTS: i64 = 10_i64.pow(MAX_INTEGER_DIGITS + 2) - 1;

#[derive(Debug, Clone, PartialEq)]
pub struct BankCard {
    pub id: i64,
    pub bank_name: String,
    pub card_number: String,
    pub balance: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl fmt::Display for BankCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.bank_name, self.card_number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deposit {
    pub id: i64,
    pub amount: Decimal,
    pub bank_card_id: i64,
    pub purpose: String,
    pub depositor: String,
    pub deposit_date: NaiveDateTime,
    pub tag_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Withdrawal {
    pub id: i64,
    pub amount: Decimal,
    pub bank_card_id: i64,
    pub purpose: String,
    pub withdrawal_date: NaiveDateTime,
    pub tag_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// Input for a deposit that has not been stored yet. A missing date means "now".
#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub amount: Decimal,
    pub bank_card_id: i64,
    pub purpose: String,
    pub depositor: String,
    pub deposit_date: Option<NaiveDateTime>,
    pub tag_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub amount: Decimal,
    pub bank_card_id: i64,
    pub purpose: String,
    pub withdrawal_date: Option<NaiveDateTime>,
    pub tag_id: Option<i64>,
}

/// Changes to the non-monetary fields of a stored deposit or withdrawal.
/// `tag: Some(None)` clears the tag.
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub purpose: Option<String>,
    pub depositor: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub tag: Option<Option<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Convert a user-supplied amount into stored minor units, rejecting
/// non-positive values, sub-cent precision and values too wide for the ledger.
pub fn to_cents(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(CardbookError::validation(format!(
            "amount must be greater than zero (got {amount})"
        )));
    }
    if amount.normalize().scale() > 2 {
        return Err(CardbookError::validation(format!(
            "amount must have at most 2 decimal places (got {amount})"
        )));
    }
    if amount.trunc() >= Decimal::from(10_i64.pow(MAX_INTEGER_DIGITS)) {
        return Err(CardbookError::validation(format!("amount is too large (got {amount})")));
    }
    (amount * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| CardbookError::validation(format!("amount is too large (got {amount})")))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Trim a required text field and check it fits within `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CardbookError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(CardbookError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_color(color: &str) -> Result<String> {
    let color = color.trim();
    let ok = Regex::new(r"^#[0-9A-Fa-f]{6}$")
        .map(|re| re.is_match(color))
        .unwrap_or(false);
    if !ok {
        return Err(CardbookError::validation(format!(
            "color must be a hex value like #1a2b3c (got {color})"
        )));
    }
    Ok(color.to_lowercase())
}

/// Timestamps are stored at whole-second precision.
pub fn to_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}
