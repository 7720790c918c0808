use chrono::NaiveDateTime;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use crate::error::{not_found, CardbookError, Result};
use crate::models::{from_cents, require_text, to_seconds, BankCard, MAX_BANK_NAME, MAX_CARD_NUMBER};

const CARD_COLUMNS: &str = "id, bank_name, card_number, balance_cents, created_at, updated_at";

pub(crate) fn map_card(row: &Row<'_>) -> rusqlite::Result<BankCard> {
    Ok(BankCard {
        id: row.get(0)?,
        bank_name: row.get(1)?,
        card_number: row.get(2)?,
        balance: from_cents(row.get(3)?),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn card_number_taken(conn: &Connection, card_number: &str, except_id: Option<i64>) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM bank_cards WHERE card_number = ?1 AND id != ?2)",
        rusqlite::params![card_number, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

/// Register a new card. Cards always start with a zero balance; only deposits
/// and withdrawals move it.
pub fn create_card(
    conn: &Connection,
    bank_name: &str,
    card_number: &str,
    now: NaiveDateTime,
) -> Result<BankCard> {
    let bank_name = require_text("bank name", bank_name, MAX_BANK_NAME)?;
    let card_number = require_text("card number", card_number, MAX_CARD_NUMBER)?;
    if card_number_taken(conn, &card_number, None)? {
        return Err(CardbookError::validation(format!(
            "card number already exists: {card_number}"
        )));
    }
    let now = to_seconds(now);
    conn.execute(
        "INSERT INTO bank_cards (bank_name, card_number, balance_cents, created_at, updated_at) \
         VALUES (?1, ?2, 0, ?3, ?3)",
        rusqlite::params![bank_name, card_number, now],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(card_id = id, %bank_name, %card_number, "created bank card");
    get_card(conn, id)
}

pub fn get_card(conn: &Connection, id: i64) -> Result<BankCard> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM bank_cards WHERE id = ?1"),
        [id],
        map_card,
    )
    .map_err(not_found("Bank card", id))
}

pub fn all_cards(conn: &Connection) -> Result<Vec<BankCard>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CARD_COLUMNS} FROM bank_cards ORDER BY bank_name, card_number"
    ))?;
    let cards = stmt
        .query_map([], map_card)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(cards)
}

/// Edit the descriptive fields of a card. The balance is never editable here.
pub fn update_card(
    conn: &Connection,
    id: i64,
    bank_name: Option<&str>,
    card_number: Option<&str>,
    now: NaiveDateTime,
) -> Result<BankCard> {
    let current = get_card(conn, id)?;
    let bank_name = match bank_name {
        Some(name) => require_text("bank name", name, MAX_BANK_NAME)?,
        None => current.bank_name,
    };
    let card_number = match card_number {
        Some(number) => require_text("card number", number, MAX_CARD_NUMBER)?,
        None => current.card_number,
    };
    if card_number_taken(conn, &card_number, Some(id))? {
        return Err(CardbookError::validation(format!(
            "card number already exists: {card_number}"
        )));
    }
    conn.execute(
        "UPDATE bank_cards SET bank_name = ?1, card_number = ?2, updated_at = ?3 WHERE id = ?4",
        rusqlite::params![bank_name, card_number, to_seconds(now), id],
    )?;
    tracing::info!(card_id = id, "updated bank card");
    get_card(conn, id)
}

pub struct CardDeletion {
    pub card: BankCard,
    pub deposits_removed: i64,
    pub withdrawals_removed: i64,
}

/// Delete a card together with every deposit and withdrawal recorded on it.
pub fn delete_card(conn: &mut Connection, id: i64) -> Result<CardDeletion> {
    let tx = conn.transaction()?;
    let card = get_card(&tx, id)?;
    let deposits_removed: i64 = tx.query_row(
        "SELECT count(*) FROM deposits WHERE bank_card_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    let withdrawals_removed: i64 = tx.query_row(
        "SELECT count(*) FROM withdrawals WHERE bank_card_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    tx.execute("DELETE FROM bank_cards WHERE id = ?1", [id])?;
    tx.commit()?;
    tracing::info!(
        card_id = id,
        deposits_removed,
        withdrawals_removed,
        "deleted bank card"
    );
    Ok(CardDeletion {
        card,
        deposits_removed,
        withdrawals_removed,
    })
}

// ---------------------------------------------------------------------------
// Balance verification
// ---------------------------------------------------------------------------

pub struct BalanceCheck {
    pub card: BankCard,
    /// Sum of deposits minus sum of withdrawals on the card.
    pub computed: Decimal,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        self.card.balance == self.computed
    }

    pub fn drift(&self) -> Decimal {
        self.card.balance - self.computed
    }
}

/// Recompute every card balance from its transactions and compare it with the
/// cached value.
pub fn verify_balances(conn: &Connection) -> Result<Vec<BalanceCheck>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, \
         COALESCE((SELECT SUM(amount_cents) FROM deposits d WHERE d.bank_card_id = c.id), 0) \
         - COALESCE((SELECT SUM(amount_cents) FROM withdrawals w WHERE w.bank_card_id = c.id), 0) \
         FROM bank_cards c",
    )?;
    let computed: Vec<(i64, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut checks = Vec::with_capacity(computed.len());
    for card in all_cards(conn)? {
        let cents = computed
            .iter()
            .find(|(id, _)| *id == card.id)
            .map(|(_, cents)| *cents)
            .unwrap_or(0);
        let check = BalanceCheck {
            card,
            computed: from_cents(cents),
        };
        if !check.is_consistent() {
            tracing::warn!(
                card_id = check.card.id,
                cached = %check.card.balance,
                computed = %check.computed,
                "card balance drifted from its transactions"
            );
        }
        checks.push(check);
    }
    Ok(checks)
}
