pub mod backup;
pub mod cards;
pub mod deposits;
pub mod export;
pub mod init;
pub mod report;
pub mod status;
pub mod tags;
pub mod transactions;
pub mod withdrawals;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::get_connection;
use crate::error::{CardbookError, Result};
use crate::feed::TransactionFilter;
use crate::settings::get_db_path;

pub(crate) const DATETIME_DISPLAY: &str = "%Y-%m-%d %H:%M";

/// Wall-clock time for stamping new records.
pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub(crate) fn open_db() -> Result<Connection> {
    let path = get_db_path();
    if !path.exists() {
        return Err(CardbookError::Settings(format!(
            "database not found at {}; run `cardbook init` first",
            path.display()
        )));
    }
    get_connection(&path)
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM` or a bare date (midnight).
pub(crate) fn parse_datetime_arg(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| format!("invalid date '{raw}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM)"))
}

/// Render `text` in a tag's `#rrggbb` color.
pub(crate) fn paint(text: &str, hex: &str) -> ColoredString {
    let channel = |i: usize| hex.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok());
    match (channel(1), channel(3), channel(5)) {
        (Some(r), Some(g), Some(b)) => text.truecolor(r, g, b),
        _ => text.normal(),
    }
}

#[derive(Parser)]
#[command(name = "cardbook", about = "Bank card ledger: deposits, withdrawals, tags and balances.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for cardbook data (default: ~/Documents/cardbook)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Show the current database and record counts.
    Status,
    /// Card count, total balance and all-time deposit/withdrawal totals.
    Dashboard,
    /// Manage bank cards.
    Cards {
        #[command(subcommand)]
        command: CardsCommands,
    },
    /// Manage tags.
    Tags {
        #[command(subcommand)]
        command: TagsCommands,
    },
    /// Manage deposits.
    Deposits {
        #[command(subcommand)]
        command: DepositsCommands,
    },
    /// Manage withdrawals.
    Withdrawals {
        #[command(subcommand)]
        command: WithdrawalsCommands,
    },
    /// List deposits and withdrawals together, newest first.
    Transactions {
        #[command(flatten)]
        filter: FilterArgs,
        /// Page number (20 transactions per page)
        #[arg(long)]
        page: Option<String>,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export data to CSV.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/cardbook-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
}

/// Transaction filters. Values that do not parse are ignored.
#[derive(clap::Args, Debug, Default)]
pub struct FilterArgs {
    /// Tag ID
    #[arg(long)]
    pub tag: Option<String>,
    /// Bank card ID
    #[arg(long)]
    pub card: Option<String>,
    /// First day to include: YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// Last day to include: YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Text to look for in purpose, depositor, bank name or card number
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> TransactionFilter {
        TransactionFilter::from_params(
            self.tag.as_deref(),
            self.card.as_deref(),
            self.from_date.as_deref(),
            self.to_date.as_deref(),
        )
        .with_search(self.search.as_deref())
    }
}

#[derive(Subcommand)]
pub enum CardsCommands {
    /// Register a bank card.
    Add {
        /// Bank name, e.g. 'Mellat'
        bank_name: String,
        /// Card number (must be unique)
        card_number: String,
    },
    /// List all cards with their balances.
    List,
    /// Change a card's bank name or number.
    Edit {
        /// Card ID (shown in `cardbook cards list`)
        id: i64,
        #[arg(long = "bank")]
        bank_name: Option<String>,
        #[arg(long = "number")]
        card_number: Option<String>,
    },
    /// Delete a card and every deposit and withdrawal on it.
    Delete {
        id: i64,
    },
    /// Recompute balances from transactions and report any drift.
    Verify,
}

#[derive(Subcommand)]
pub enum TagsCommands {
    /// Create a tag.
    Add {
        name: String,
        /// Hex color, e.g. '#ff8800' (default: #007bff)
        #[arg(long)]
        color: Option<String>,
    },
    /// List all tags.
    List,
    /// Rename or recolor a tag.
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a tag. Its transactions are kept, untagged.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum DepositsCommands {
    /// Record a deposit and credit the card.
    Add {
        /// Amount, e.g. 1250.50
        amount: Decimal,
        /// Bank card ID
        #[arg(long)]
        card: i64,
        /// What the money is for
        #[arg(long)]
        purpose: String,
        /// Who deposited it
        #[arg(long)]
        depositor: String,
        /// Deposit date (default: now)
        #[arg(long, value_parser = parse_datetime_arg)]
        date: Option<NaiveDateTime>,
        /// Tag ID
        #[arg(long)]
        tag: Option<i64>,
    },
    /// Show one deposit.
    Show {
        id: i64,
    },
    /// Edit purpose, depositor, date or tag. Amount and card cannot change.
    Edit {
        id: i64,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        depositor: Option<String>,
        #[arg(long, value_parser = parse_datetime_arg)]
        date: Option<NaiveDateTime>,
        #[arg(long, conflicts_with = "clear_tag")]
        tag: Option<i64>,
        /// Remove the tag
        #[arg(long = "clear-tag")]
        clear_tag: bool,
    },
    /// Delete a deposit and debit the card.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum WithdrawalsCommands {
    /// Record a withdrawal if the card has enough funds.
    Add {
        /// Amount, e.g. 300
        amount: Decimal,
        /// Bank card ID
        #[arg(long)]
        card: i64,
        /// What the money was spent on
        #[arg(long)]
        purpose: String,
        /// Withdrawal date (default: now)
        #[arg(long, value_parser = parse_datetime_arg)]
        date: Option<NaiveDateTime>,
        /// Tag ID
        #[arg(long)]
        tag: Option<i64>,
    },
    /// Show one withdrawal.
    Show {
        id: i64,
    },
    /// Edit purpose, date or tag. Amount and card cannot change.
    Edit {
        id: i64,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long, value_parser = parse_datetime_arg)]
        date: Option<NaiveDateTime>,
        #[arg(long, conflicts_with = "clear_tag")]
        tag: Option<i64>,
        /// Remove the tag
        #[arg(long = "clear-tag")]
        clear_tag: bool,
    },
    /// Delete a withdrawal and credit the card back.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Deposit, withdrawal and net totals per tag.
    Tags,
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export the filtered transaction feed.
    Transactions {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

/// `--tag`/`--clear-tag` pair into the edit representation.
pub(crate) fn tag_change(tag: Option<i64>, clear_tag: bool) -> Option<Option<i64>> {
    if clear_tag {
        Some(None)
    } else {
        tag.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_arg() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(parse_datetime_arg("2025-03-09").unwrap(), d.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(parse_datetime_arg("2025-03-09 14:30").unwrap(), d.and_hms_opt(14, 30, 0).unwrap());
        assert_eq!(
            parse_datetime_arg("2025-03-09 14:30:15").unwrap(),
            d.and_hms_opt(14, 30, 15).unwrap()
        );
        assert!(parse_datetime_arg("09/03/2025").is_err());
    }

    #[test]
    fn test_tag_change() {
        assert_eq!(tag_change(None, false), None);
        assert_eq!(tag_change(Some(3), false), Some(Some(3)));
        assert_eq!(tag_change(None, true), Some(None));
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
