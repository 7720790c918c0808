use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::cards::all_cards;
use crate::error::Result;
use crate::models::{from_cents, BankCard};

pub const UNTAGGED_LABEL: &str = "no tag";
pub const UNTAGGED_COLOR: &str = "#6c757d";

fn sum_cents(conn: &Connection, sql: &str) -> Result<Decimal> {
    let cents: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(from_cents(cents))
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub card_count: i64,
    pub total_balance: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
}

pub fn get_dashboard_summary(conn: &Connection) -> Result<DashboardSummary> {
    let card_count: i64 = conn.query_row("SELECT count(*) FROM bank_cards", [], |r| r.get(0))?;
    let summary = DashboardSummary {
        card_count,
        total_balance: sum_cents(conn, "SELECT COALESCE(SUM(balance_cents), 0) FROM bank_cards")?,
        total_deposits: sum_cents(conn, "SELECT COALESCE(SUM(amount_cents), 0) FROM deposits")?,
        total_withdrawals: sum_cents(conn, "SELECT COALESCE(SUM(amount_cents), 0) FROM withdrawals")?,
    };
    tracing::debug!(?summary, "built dashboard summary");
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tag summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TagTotal {
    /// `None` for the untagged bucket.
    pub tag_id: Option<i64>,
    pub name: String,
    pub color: String,
    pub deposits: Decimal,
    pub withdrawals: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagSummary {
    pub tags: Vec<TagTotal>,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
}

struct TagGroup {
    tag_id: Option<i64>,
    name: Option<String>,
    color: Option<String>,
    total: Decimal,
}

fn totals_by_tag(conn: &Connection, table: &str) -> Result<Vec<TagGroup>> {
    let sql = format!(
        "SELECT x.tag_id, t.name, t.color, SUM(x.amount_cents) as total \
         FROM {table} x LEFT JOIN tags t ON x.tag_id = t.id \
         GROUP BY x.tag_id ORDER BY total DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TagGroup {
                tag_id: row.get(0)?,
                name: row.get(1)?,
                color: row.get(2)?,
                total: from_cents(row.get(3)?),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn bucket<'a>(buckets: &'a mut Vec<TagTotal>, group: &TagGroup) -> &'a mut TagTotal {
    let pos = match buckets.iter().position(|b| b.tag_id == group.tag_id) {
        Some(pos) => pos,
        None => {
            buckets.push(TagTotal {
                tag_id: group.tag_id,
                name: group.name.clone().unwrap_or_else(|| UNTAGGED_LABEL.to_string()),
                color: group.color.clone().unwrap_or_else(|| UNTAGGED_COLOR.to_string()),
                deposits: Decimal::ZERO,
                withdrawals: Decimal::ZERO,
                net: Decimal::ZERO,
            });
            buckets.len() - 1
        }
    };
    &mut buckets[pos]
}

/// Deposit, withdrawal and net totals for every tag in use plus the untagged
/// bucket. Buckets are keyed by tag id and sorted by volume.
pub fn get_tag_summary(conn: &Connection) -> Result<TagSummary> {
    let mut buckets: Vec<TagTotal> = Vec::new();
    for group in totals_by_tag(conn, "deposits")? {
        bucket(&mut buckets, &group).deposits = group.total;
    }
    for group in totals_by_tag(conn, "withdrawals")? {
        bucket(&mut buckets, &group).withdrawals = group.total;
    }
    for b in &mut buckets {
        b.net = b.deposits - b.withdrawals;
    }
    buckets.sort_by(|a, b| {
        (b.deposits + b.withdrawals)
            .cmp(&(a.deposits + a.withdrawals))
            .then_with(|| a.name.cmp(&b.name))
    });

    let total_deposits = buckets.iter().map(|b| b.deposits).sum();
    let total_withdrawals = buckets.iter().map(|b| b.withdrawals).sum();
    tracing::debug!(buckets = buckets.len(), "built tag summary");
    Ok(TagSummary {
        tags: buckets,
        total_deposits,
        total_withdrawals,
    })
}

// ---------------------------------------------------------------------------
// Card list
// ---------------------------------------------------------------------------

pub struct CardList {
    pub cards: Vec<BankCard>,
    pub total_balance: Decimal,
}

pub fn list_bank_cards(conn: &Connection) -> Result<CardList> {
    let cards = all_cards(conn)?;
    let total_balance = cards.iter().map(|c| c.balance).sum();
    Ok(CardList { cards, total_balance })
}
