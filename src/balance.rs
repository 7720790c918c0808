//! Deposit and withdrawal lifecycle.
//!
//! Every function here that creates or deletes a transaction also moves the
//! cached `bank_cards.balance_cents` of the card it belongs to, inside a single
//! `IMMEDIATE` SQLite transaction. The write lock is taken before the balance
//! is read, so two concurrent withdrawals cannot both pass the funds check
//! against the same stale balance. Any error drops the transaction, which rolls
//! back both the balance change and the row write.

use chrono::NaiveDateTime;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};

use crate::error::{not_found, CardbookError, Result};
use crate::models::{
    from_cents, require_text, to_cents, to_seconds, Deposit, NewDeposit, NewWithdrawal,
    TransactionEdit, Withdrawal, MAX_BALANCE_CENTS, MAX_DEPOSITOR, MAX_PURPOSE,
};
use crate::tags::get_tag;

const DEPOSIT_COLUMNS: &str =
    "id, amount_cents, bank_card_id, purpose, depositor, deposit_date, tag_id, created_at";
const WITHDRAWAL_COLUMNS: &str =
    "id, amount_cents, bank_card_id, purpose, withdrawal_date, tag_id, created_at";

fn map_deposit(row: &Row<'_>) -> rusqlite::Result<Deposit> {
    Ok(Deposit {
        id: row.get(0)?,
        amount: from_cents(row.get(1)?),
        bank_card_id: row.get(2)?,
        purpose: row.get(3)?,
        depositor: row.get(4)?,
        deposit_date: row.get(5)?,
        tag_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_withdrawal(row: &Row<'_>) -> rusqlite::Result<Withdrawal> {
    Ok(Withdrawal {
        id: row.get(0)?,
        amount: from_cents(row.get(1)?),
        bank_card_id: row.get(2)?,
        purpose: row.get(3)?,
        withdrawal_date: row.get(4)?,
        tag_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn begin(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

fn card_balance_cents(conn: &Connection, card_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT balance_cents FROM bank_cards WHERE id = ?1",
        [card_id],
        |row| row.get(0),
    )
    .map_err(not_found("Bank card", card_id))
}

fn ensure_tag(conn: &Connection, tag_id: Option<i64>) -> Result<()> {
    if let Some(id) = tag_id {
        get_tag(conn, id)?;
    }
    Ok(())
}

/// Balance after crediting `amount_cents`, refused past the ledger's width.
fn credited_balance(card_id: i64, balance_cents: i64, amount_cents: i64) -> Result<i64> {
    balance_cents
        .checked_add(amount_cents)
        .filter(|total| *total <= MAX_BALANCE_CENTS)
        .ok_or_else(|| {
            CardbookError::validation(format!(
                "card {card_id} balance would exceed {}",
                from_cents(MAX_BALANCE_CENTS)
            ))
        })
}

fn adjust_balance(conn: &Connection, card_id: i64, delta_cents: i64, now: NaiveDateTime) -> Result<()> {
    conn.execute(
        "UPDATE bank_cards SET balance_cents = balance_cents + ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![delta_cents, now, card_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

pub fn get_deposit(conn: &Connection, id: i64) -> Result<Deposit> {
    conn.query_row(
        &format!("SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE id = ?1"),
        [id],
        map_deposit,
    )
    .map_err(not_found("Deposit", id))
}

/// Record a deposit and credit its card. The resulting balance must stay
/// within `MAX_BALANCE_CENTS`.
pub fn create_deposit(conn: &mut Connection, new: NewDeposit, now: NaiveDateTime) -> Result<Deposit> {
    let amount_cents = to_cents(new.amount)?;
    let purpose = require_text("purpose", &new.purpose, MAX_PURPOSE)?;
    let depositor = require_text("depositor", &new.depositor, MAX_DEPOSITOR)?;
    let now = to_seconds(now);
    let deposit_date = new.deposit_date.map(to_seconds).unwrap_or(now);

    let tx = begin(conn)?;
    let balance_cents = card_balance_cents(&tx, new.bank_card_id)?;
    ensure_tag(&tx, new.tag_id)?;
    credited_balance(new.bank_card_id, balance_cents, amount_cents)?;
    adjust_balance(&tx, new.bank_card_id, amount_cents, now)?;
    tx.execute(
        "INSERT INTO deposits (amount_cents, bank_card_id, purpose, depositor, deposit_date, tag_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![amount_cents, new.bank_card_id, purpose, depositor, deposit_date, new.tag_id, now],
    )?;
    let deposit = get_deposit(&tx, tx.last_insert_rowid())?;
    tx.commit()?;

    tracing::info!(
        deposit_id = deposit.id,
        card_id = deposit.bank_card_id,
        amount = %deposit.amount,
        "recorded deposit"
    );
    Ok(deposit)
}

/// Delete a deposit and debit its card. Refused when the card no longer holds
/// enough to give the amount back.
pub fn delete_deposit(conn: &mut Connection, id: i64, now: NaiveDateTime) -> Result<Deposit> {
    let tx = begin(conn)?;
    let deposit = get_deposit(&tx, id)?;
    let amount_cents = to_cents(deposit.amount)?;
    let balance_cents = card_balance_cents(&tx, deposit.bank_card_id)?;
    if balance_cents < amount_cents {
        tracing::warn!(
            deposit_id = id,
            card_id = deposit.bank_card_id,
            balance = %from_cents(balance_cents),
            amount = %deposit.amount,
            "refused deposit deletion: balance would go negative"
        );
        return Err(CardbookError::NegativeBalance {
            card_id: deposit.bank_card_id,
            balance: from_cents(balance_cents),
            amount: deposit.amount,
        });
    }
    adjust_balance(&tx, deposit.bank_card_id, -amount_cents, to_seconds(now))?;
    tx.execute("DELETE FROM deposits WHERE id = ?1", [id])?;
    tx.commit()?;

    tracing::info!(
        deposit_id = id,
        card_id = deposit.bank_card_id,
        amount = %deposit.amount,
        "deleted deposit"
    );
    Ok(deposit)
}

/// Edit the descriptive fields of a deposit. Amount and card are fixed, so the
/// balance is untouched.
pub fn update_deposit(conn: &Connection, id: i64, edit: TransactionEdit) -> Result<Deposit> {
    let current = get_deposit(conn, id)?;
    let purpose = match edit.purpose {
        Some(p) => require_text("purpose", &p, MAX_PURPOSE)?,
        None => current.purpose,
    };
    let depositor = match edit.depositor {
        Some(d) => require_text("depositor", &d, MAX_DEPOSITOR)?,
        None => current.depositor,
    };
    let deposit_date = edit.date.map(to_seconds).unwrap_or(current.deposit_date);
    let tag_id = edit.tag.unwrap_or(current.tag_id);
    ensure_tag(conn, tag_id)?;

    conn.execute(
        "UPDATE deposits SET purpose = ?1, depositor = ?2, deposit_date = ?3, tag_id = ?4 WHERE id = ?5",
        rusqlite::params![purpose, depositor, deposit_date, tag_id, id],
    )?;
    tracing::info!(deposit_id = id, "updated deposit");
    get_deposit(conn, id)
}

// ---------------------------------------------------------------------------
// Withdrawals
// ---------------------------------------------------------------------------

pub fn get_withdrawal(conn: &Connection, id: i64) -> Result<Withdrawal> {
    conn.query_row(
        &format!("SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals WHERE id = ?1"),
        [id],
        map_withdrawal,
    )
    .map_err(not_found("Withdrawal", id))
}

/// Record a withdrawal if the card can cover it. On `InsufficientFunds` nothing
/// is written.
pub fn create_withdrawal(conn: &mut Connection, new: NewWithdrawal, now: NaiveDateTime) -> Result<Withdrawal> {
    let amount_cents = to_cents(new.amount)?;
    let purpose = require_text("purpose", &new.purpose, MAX_PURPOSE)?;
    let now = to_seconds(now);
    let withdrawal_date = new.withdrawal_date.map(to_seconds).unwrap_or(now);

    let tx = begin(conn)?;
    let balance_cents = card_balance_cents(&tx, new.bank_card_id)?;
    ensure_tag(&tx, new.tag_id)?;
    if balance_cents < amount_cents {
        tracing::warn!(
            card_id = new.bank_card_id,
            balance = %from_cents(balance_cents),
            requested = %new.amount,
            "refused withdrawal: insufficient funds"
        );
        return Err(CardbookError::InsufficientFunds {
            card_id: new.bank_card_id,
            balance: from_cents(balance_cents),
            requested: new.amount,
        });
    }
    adjust_balance(&tx, new.bank_card_id, -amount_cents, now)?;
    tx.execute(
        "INSERT INTO withdrawals (amount_cents, bank_card_id, purpose, withdrawal_date, tag_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![amount_cents, new.bank_card_id, purpose, withdrawal_date, new.tag_id, now],
    )?;
    let withdrawal = get_withdrawal(&tx, tx.last_insert_rowid())?;
    tx.commit()?;

    tracing::info!(
        withdrawal_id = withdrawal.id,
        card_id = withdrawal.bank_card_id,
        amount = %withdrawal.amount,
        "recorded withdrawal"
    );
    Ok(withdrawal)
}

/// Delete a withdrawal and give the amount back to its card, within the same
/// balance ceiling as deposits.
pub fn delete_withdrawal(conn: &mut Connection, id: i64, now: NaiveDateTime) -> Result<Withdrawal> {
    let tx = begin(conn)?;
    let withdrawal = get_withdrawal(&tx, id)?;
    let amount_cents = to_cents(withdrawal.amount)?;
    let balance_cents = card_balance_cents(&tx, withdrawal.bank_card_id)?;
    credited_balance(withdrawal.bank_card_id, balance_cents, amount_cents)?;
    adjust_balance(&tx, withdrawal.bank_card_id, amount_cents, to_seconds(now))?;
    tx.execute("DELETE FROM withdrawals WHERE id = ?1", [id])?;
    tx.commit()?;

    tracing::info!(
        withdrawal_id = id,
        card_id = withdrawal.bank_card_id,
        amount = %withdrawal.amount,
        "deleted withdrawal"
    );
    Ok(withdrawal)
}

pub fn update_withdrawal(conn: &Connection, id: i64, edit: TransactionEdit) -> Result<Withdrawal> {
    if edit.depositor.is_some() {
        return Err(CardbookError::validation("withdrawals have no depositor"));
    }
    let current = get_withdrawal(conn, id)?;
    let purpose = match edit.purpose {
        Some(p) => require_text("purpose", &p, MAX_PURPOSE)?,
        None => current.purpose,
    };
    let withdrawal_date = edit.date.map(to_seconds).unwrap_or(current.withdrawal_date);
    let tag_id = edit.tag.unwrap_or(current.tag_id);
    ensure_tag(conn, tag_id)?;

    conn.execute(
        "UPDATE withdrawals SET purpose = ?1, withdrawal_date = ?2, tag_id = ?3 WHERE id = ?4",
        rusqlite::params![purpose, withdrawal_date, tag_id, id],
    )?;
    tracing::info!(withdrawal_id = id, "updated withdrawal");
    get_withdrawal(conn, id)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cards::tests::at;
    use crate::cards::{create_card, delete_card, get_card};
    use crate::db::{get_connection, test_db};
    use crate::tags::create_tag;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    pub(crate) fn deposit(card_id: i64, amount: Decimal) -> NewDeposit {
        NewDeposit {
            amount,
            bank_card_id: card_id,
            purpose: "salary".into(),
            depositor: "ACME".into(),
            deposit_date: None,
            tag_id: None,
        }
    }

    pub(crate) fn withdrawal(card_id: i64, amount: Decimal) -> NewWithdrawal {
        NewWithdrawal {
            amount,
            bank_card_id: card_id,
            purpose: "rent".into(),
            withdrawal_date: None,
            tag_id: None,
        }
    }

    fn balance(conn: &Connection, card_id: i64) -> Decimal {
        get_card(conn, card_id).unwrap().balance
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_deposit_credits_card() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        let d = create_deposit(&mut conn, deposit(card.id, dec!(1000)), at(2, 9)).unwrap();
        assert_eq!(d.amount, dec!(1000));
        assert_eq!(d.deposit_date, at(2, 9));
        assert_eq!(d.created_at, at(2, 9));
        assert_eq!(balance(&conn, card.id), dec!(1000));
        assert_eq!(get_card(&conn, card.id).unwrap().updated_at, at(2, 9));
    }

    #[test]
    fn test_deposit_keeps_explicit_date() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        let mut new = deposit(card.id, dec!(10));
        new.deposit_date = Some(at(1, 12));
        let d = create_deposit(&mut conn, new, at(5, 9)).unwrap();
        assert_eq!(d.deposit_date, at(1, 12));
        assert_eq!(d.created_at, at(5, 9));
    }

    #[test]
    fn test_reference_scenario() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        assert_eq!(balance(&conn, card.id), dec!(0));

        let d = create_deposit(&mut conn, deposit(card.id, dec!(1000)), at(2, 9)).unwrap();
        assert_eq!(balance(&conn, card.id), dec!(1000));

        create_withdrawal(&mut conn, withdrawal(card.id, dec!(300)), at(3, 9)).unwrap();
        assert_eq!(balance(&conn, card.id), dec!(700));

        let err = create_withdrawal(&mut conn, withdrawal(card.id, dec!(800)), at(4, 9)).unwrap_err();
        match err {
            CardbookError::InsufficientFunds { balance, requested, .. } => {
                assert_eq!(balance, dec!(700));
                assert_eq!(requested, dec!(800));
            }
            other => panic!("expected InsufficientFunds, got {other}"),
        }
        assert_eq!(balance(&conn, card.id), dec!(700));
        assert_eq!(count(&conn, "withdrawals"), 1);

        let err = delete_deposit(&mut conn, d.id, at(5, 9)).unwrap_err();
        assert!(matches!(err, CardbookError::NegativeBalance { .. }), "got: {err}");
        assert_eq!(balance(&conn, card.id), dec!(700));
        assert_eq!(count(&conn, "deposits"), 1);
    }

    #[test]
    fn test_withdrawal_of_entire_balance_allowed() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        create_deposit(&mut conn, deposit(card.id, dec!(50.25)), at(2, 9)).unwrap();
        create_withdrawal(&mut conn, withdrawal(card.id, dec!(50.25)), at(3, 9)).unwrap();
        assert_eq!(balance(&conn, card.id), dec!(0));
    }

    #[test]
    fn test_withdrawal_from_empty_card_fails() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        let err = create_withdrawal(&mut conn, withdrawal(card.id, dec!(0.01)), at(2, 9)).unwrap_err();
        assert!(matches!(err, CardbookError::InsufficientFunds { .. }));
        assert_eq!(count(&conn, "withdrawals"), 0);
    }

    #[test]
    fn test_create_then_delete_restores_balance() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        create_deposit(&mut conn, deposit(card.id, dec!(500)), at(2, 9)).unwrap();

        let d = create_deposit(&mut conn, deposit(card.id, dec!(120.40)), at(3, 9)).unwrap();
        assert_eq!(balance(&conn, card.id), dec!(620.40));
        let removed = delete_deposit(&mut conn, d.id, at(3, 10)).unwrap();
        assert_eq!(removed.amount, dec!(120.40));
        assert_eq!(balance(&conn, card.id), dec!(500));

        let w = create_withdrawal(&mut conn, withdrawal(card.id, dec!(99.99)), at(4, 9)).unwrap();
        assert_eq!(balance(&conn, card.id), dec!(400.01));
        delete_withdrawal(&mut conn, w.id, at(4, 10)).unwrap();
        assert_eq!(balance(&conn, card.id), dec!(500));
        assert!(matches!(get_withdrawal(&conn, w.id), Err(CardbookError::NotFound { .. })));
    }

    #[test]
    fn test_balance_matches_ledger_over_sequence() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        let amounts = [dec!(100), dec!(250.50), dec!(3), dec!(75.25)];
        let mut deposits = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            deposits.push(create_deposit(&mut conn, deposit(card.id, *amount), at(2 + i as u32, 9)).unwrap());
        }
        let mut withdrawals = Vec::new();
        for amount in [dec!(40), dec!(200), dec!(10000), dec!(0.75)] {
            if let Ok(w) = create_withdrawal(&mut conn, withdrawal(card.id, amount), at(10, 9)) {
                withdrawals.push(w);
            }
        }
        assert_eq!(withdrawals.len(), 3);
        delete_withdrawal(&mut conn, withdrawals[1].id, at(11, 9)).unwrap();
        delete_deposit(&mut conn, deposits[2].id, at(11, 9)).unwrap();

        let checks = crate::cards::verify_balances(&conn).unwrap();
        assert!(checks[0].is_consistent());
        // 100 + 250.50 + 75.25 - 40 - 0.75
        assert_eq!(balance(&conn, card.id), dec!(385.00));
    }

    #[test]
    fn test_validation_happens_before_any_write() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();

        assert!(matches!(
            create_deposit(&mut conn, deposit(card.id, dec!(0)), at(2, 9)),
            Err(CardbookError::Validation(_))
        ));
        assert!(matches!(
            create_deposit(&mut conn, deposit(card.id, dec!(1.234)), at(2, 9)),
            Err(CardbookError::Validation(_))
        ));
        let mut blank = deposit(card.id, dec!(5));
        blank.depositor = "  ".into();
        assert!(matches!(
            create_deposit(&mut conn, blank, at(2, 9)),
            Err(CardbookError::Validation(_))
        ));
        assert!(matches!(
            create_withdrawal(&mut conn, withdrawal(card.id, dec!(-1)), at(2, 9)),
            Err(CardbookError::Validation(_))
        ));
        assert_eq!(balance(&conn, card.id), dec!(0));
        assert_eq!(count(&conn, "deposits"), 0);
    }

    #[test]
    fn test_unknown_card_or_tag_is_not_found() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        assert!(matches!(
            create_deposit(&mut conn, deposit(99, dec!(5)), at(2, 9)),
            Err(CardbookError::NotFound { entity: "Bank card", id: 99 })
        ));
        let mut tagged = deposit(card.id, dec!(5));
        tagged.tag_id = Some(7);
        assert!(matches!(
            create_deposit(&mut conn, tagged, at(2, 9)),
            Err(CardbookError::NotFound { entity: "Tag", id: 7 })
        ));
        assert_eq!(balance(&conn, card.id), dec!(0));
        assert!(matches!(delete_deposit(&mut conn, 5, at(2, 9)), Err(CardbookError::NotFound { .. })));
        assert!(matches!(delete_withdrawal(&mut conn, 5, at(2, 9)), Err(CardbookError::NotFound { .. })));
    }

    #[test]
    fn test_delete_card_cascades() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        let other = create_card(&conn, "Saman", "2222", at(1, 9)).unwrap();
        create_deposit(&mut conn, deposit(card.id, dec!(100)), at(2, 9)).unwrap();
        create_deposit(&mut conn, deposit(other.id, dec!(100)), at(2, 9)).unwrap();
        create_withdrawal(&mut conn, withdrawal(card.id, dec!(30)), at(3, 9)).unwrap();

        let deletion = delete_card(&mut conn, card.id).unwrap();
        assert_eq!(deletion.deposits_removed, 1);
        assert_eq!(deletion.withdrawals_removed, 1);
        assert_eq!(count(&conn, "deposits"), 1);
        assert_eq!(count(&conn, "withdrawals"), 0);
        assert_eq!(balance(&conn, other.id), dec!(100));
    }

    #[test]
    fn test_update_deposit_leaves_balance_alone() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        let tag = create_tag(&conn, "salary", None, at(1, 9)).unwrap();
        let d = create_deposit(&mut conn, deposit(card.id, dec!(100)), at(2, 9)).unwrap();

        let edited = update_deposit(
            &conn,
            d.id,
            TransactionEdit {
                purpose: Some("bonus".into()),
                depositor: None,
                date: Some(at(1, 18)),
                tag: Some(Some(tag.id)),
            },
        )
        .unwrap();
        assert_eq!(edited.purpose, "bonus");
        assert_eq!(edited.depositor, "ACME");
        assert_eq!(edited.deposit_date, at(1, 18));
        assert_eq!(edited.tag_id, Some(tag.id));
        assert_eq!(edited.amount, dec!(100));
        assert_eq!(balance(&conn, card.id), dec!(100));

        let cleared = update_deposit(
            &conn,
            d.id,
            TransactionEdit {
                tag: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cleared.tag_id, None);
        assert_eq!(cleared.purpose, "bonus");
    }

    #[test]
    fn test_update_withdrawal_rejects_depositor() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        create_deposit(&mut conn, deposit(card.id, dec!(100)), at(2, 9)).unwrap();
        let w = create_withdrawal(&mut conn, withdrawal(card.id, dec!(10)), at(3, 9)).unwrap();
        let err = update_withdrawal(
            &conn,
            w.id,
            TransactionEdit {
                depositor: Some("me".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CardbookError::Validation(_)));

        let edited = update_withdrawal(
            &conn,
            w.id,
            TransactionEdit {
                purpose: Some("groceries".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(edited.purpose, "groceries");
        assert_eq!(balance(&conn, card.id), dec!(90));
    }

    #[test]
    fn test_balance_capped_at_ledger_width() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        let full = dec!(9999999999999.99);
        create_deposit(&mut conn, deposit(card.id, full), at(2, 9)).unwrap();
        assert_eq!(balance(&conn, card.id), full);

        let err = create_deposit(&mut conn, deposit(card.id, dec!(0.01)), at(3, 9)).unwrap_err();
        assert!(matches!(err, CardbookError::Validation(_)), "got: {err}");
        assert_eq!(balance(&conn, card.id), full);
        assert_eq!(count(&conn, "deposits"), 1);

        // Giving back a withdrawal is a credit too.
        let w = create_withdrawal(&mut conn, withdrawal(card.id, dec!(1)), at(4, 9)).unwrap();
        create_deposit(&mut conn, deposit(card.id, dec!(1)), at(5, 9)).unwrap();
        let err = delete_withdrawal(&mut conn, w.id, at(6, 9)).unwrap_err();
        assert!(matches!(err, CardbookError::Validation(_)), "got: {err}");
        assert!(get_withdrawal(&conn, w.id).is_ok());
        assert_eq!(balance(&conn, card.id), full);

        let stored: String = conn
            .query_row("SELECT typeof(balance_cents) FROM bank_cards WHERE id = ?1", [card.id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "integer");
        assert!(crate::cards::verify_balances(&conn).unwrap()[0].is_consistent());
    }

    #[test]
    fn test_concurrent_withdrawals_are_serialized() {
        let (dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        create_deposit(&mut conn, deposit(card.id, dec!(100)), at(2, 9)).unwrap();

        let db_path = dir.path().join("test.db");
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let db_path = db_path.clone();
                let barrier = Arc::clone(&barrier);
                let card_id = card.id;
                thread::spawn(move || {
                    let mut conn = get_connection(&db_path).unwrap();
                    barrier.wait();
                    create_withdrawal(&mut conn, withdrawal(card_id, dec!(70)), at(3, 9))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(CardbookError::InsufficientFunds { .. })))
                .count(),
            1
        );
        assert_eq!(balance(&conn, card.id), dec!(30));
        assert_eq!(count(&conn, "withdrawals"), 1);
    }
}
