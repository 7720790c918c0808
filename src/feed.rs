//! Merged deposit/withdrawal feed with permissive filters and clamped pages.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::ToSql;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{from_cents, TransactionKind};

pub const PAGE_SIZE: usize = 20;

/// Withdrawals are always made by the card owner.
pub const SELF_WITHDRAWER: &str = "self";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub tag_id: Option<i64>,
    pub card_id: Option<i64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Case-insensitive substring of purpose, depositor, bank name or card number.
    pub search: Option<String>,
}

impl TransactionFilter {
    /// Build a filter from raw request parameters. Anything that does not parse
    /// is treated as if it had not been given.
    pub fn from_params(
        tag: Option<&str>,
        card: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Self {
        Self {
            tag_id: tag.and_then(parse_id),
            card_id: card.and_then(parse_id),
            start: start_date.and_then(parse_date),
            end: end_date.and_then(parse_date),
            search: None,
        }
    }

    /// Add a text search. Blank input means no search.
    pub fn with_search(mut self, search: Option<&str>) -> Self {
        self.search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        self
    }

    fn start_bound(&self) -> Option<NaiveDateTime> {
        self.start.map(|d| d.and_time(NaiveTime::MIN))
    }

    fn end_bound(&self) -> Option<NaiveDateTime> {
        self.end.and_then(|d| d.and_hms_opt(23, 59, 59))
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagRef {
    pub id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub kind: TransactionKind,
    pub id: i64,
    pub amount: Decimal,
    pub purpose: String,
    pub date: NaiveDateTime,
    pub card_id: i64,
    pub card_label: String,
    pub tag: Option<TagRef>,
    pub depositor: Option<String>,
    pub withdrawer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Slice `items` into pages of `per_page` and return the requested one. A
/// malformed page number means the first page; out-of-range numbers clamp to the
/// first or last page. An empty list still has one (empty) page.
pub fn paginate<T>(items: Vec<T>, page: Option<&str>, per_page: usize) -> Page<T> {
    let total = items.len();
    let per_page = per_page.max(1);
    let num_pages = total.div_ceil(per_page).max(1);
    let requested = page.and_then(|p| p.trim().parse::<i64>().ok()).unwrap_or(1);
    let number = requested.clamp(1, num_pages as i64) as usize;

    let items = items
        .into_iter()
        .skip((number - 1) * per_page)
        .take(per_page)
        .collect();
    Page {
        items,
        number,
        num_pages,
        total,
    }
}

struct KindQuery {
    kind: TransactionKind,
    table: &'static str,
    date_column: &'static str,
    depositor_column: &'static str,
}

const DEPOSITS: KindQuery = KindQuery {
    kind: TransactionKind::Deposit,
    table: "deposits",
    date_column: "deposit_date",
    depositor_column: "x.depositor",
};

const WITHDRAWALS: KindQuery = KindQuery {
    kind: TransactionKind::Withdrawal,
    table: "withdrawals",
    date_column: "withdrawal_date",
    depositor_column: "NULL",
};

fn fetch_kind(conn: &Connection, q: &KindQuery, filter: &TransactionFilter) -> Result<Vec<FeedEntry>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(tag_id) = filter.tag_id {
        params.push(Box::new(tag_id));
        clauses.push(format!("x.tag_id = ?{}", params.len()));
    }
    if let Some(card_id) = filter.card_id {
        params.push(Box::new(card_id));
        clauses.push(format!("x.bank_card_id = ?{}", params.len()));
    }
    if let Some(start) = filter.start_bound() {
        params.push(Box::new(start));
        clauses.push(format!("x.{} >= ?{}", q.date_column, params.len()));
    }
    if let Some(end) = filter.end_bound() {
        params.push(Box::new(end));
        clauses.push(format!("x.{} <= ?{}", q.date_column, params.len()));
    }
    if let Some(search) = &filter.search {
        params.push(Box::new(search.clone()));
        let n = params.len();
        clauses.push(format!(
            "(instr(lower(x.purpose), ?{n}) > 0 OR instr(lower({depositor}), ?{n}) > 0 \
             OR instr(lower(c.bank_name), ?{n}) > 0 OR instr(lower(c.card_number), ?{n}) > 0)",
            depositor = q.depositor_column,
        ));
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT x.id, x.amount_cents, x.purpose, x.{date}, x.bank_card_id, \
         c.bank_name || ' - ' || c.card_number, t.id, t.name, t.color, {depositor} \
         FROM {table} x \
         JOIN bank_cards c ON x.bank_card_id = c.id \
         LEFT JOIN tags t ON x.tag_id = t.id \
         {where_clause}",
        date = q.date_column,
        depositor = q.depositor_column,
        table = q.table,
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let kind = q.kind;
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let tag_id: Option<i64> = row.get(6)?;
            let tag = match tag_id {
                Some(id) => Some(TagRef {
                    id,
                    name: row.get(7)?,
                    color: row.get(8)?,
                }),
                None => None,
            };
            Ok(FeedEntry {
                kind,
                id: row.get(0)?,
                amount: from_cents(row.get(1)?),
                purpose: row.get(2)?,
                date: row.get(3)?,
                card_id: row.get(4)?,
                card_label: row.get(5)?,
                tag,
                depositor: row.get(9)?,
                withdrawer: match kind {
                    TransactionKind::Withdrawal => Some(SELF_WITHDRAWER.to_string()),
                    TransactionKind::Deposit => None,
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every deposit and withdrawal matching `filter`, newest first.
pub fn collect_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<FeedEntry>> {
    let mut entries = fetch_kind(conn, &DEPOSITS, filter)?;
    entries.extend(fetch_kind(conn, &WITHDRAWALS, filter)?);
    entries.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then(a.kind.cmp(&b.kind))
            .then(b.id.cmp(&a.id))
    });
    tracing::debug!(count = entries.len(), ?filter, "collected transaction feed");
    Ok(entries)
}

pub fn list_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
    page: Option<&str>,
) -> Result<Page<FeedEntry>> {
    let entries = collect_transactions(conn, filter)?;
    Ok(paginate(entries, page, PAGE_SIZE))
}
