use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::balance;
use crate::cards::get_card;
use crate::cli::{now, open_db, tag_change, DATETIME_DISPLAY};
use crate::error::Result;
use crate::feed::SELF_WITHDRAWER;
use crate::fmt::money;
use crate::models::{NewWithdrawal, TransactionEdit};
use crate::tags::get_tag;

pub fn add(
    amount: Decimal,
    card: i64,
    purpose: &str,
    date: Option<NaiveDateTime>,
    tag: Option<i64>,
) -> Result<()> {
    let mut conn = open_db()?;
    let withdrawal = balance::create_withdrawal(
        &mut conn,
        NewWithdrawal {
            amount,
            bank_card_id: card,
            purpose: purpose.to_string(),
            withdrawal_date: date,
            tag_id: tag,
        },
        now(),
    )?;
    let card = get_card(&conn, withdrawal.bank_card_id)?;
    println!(
        "Recorded withdrawal {} of {} from {card}. New balance: {}",
        withdrawal.id,
        money(withdrawal.amount),
        money(card.balance)
    );
    Ok(())
}

pub fn show(id: i64) -> Result<()> {
    let conn = open_db()?;
    let withdrawal = balance::get_withdrawal(&conn, id)?;
    let card = get_card(&conn, withdrawal.bank_card_id)?;
    let tag = match withdrawal.tag_id {
        Some(tag_id) => get_tag(&conn, tag_id)?.name,
        None => "-".to_string(),
    };
    println!("Withdrawal {}", withdrawal.id);
    println!("Amount:     {}", money(withdrawal.amount));
    println!("Card:       {card}");
    println!("Purpose:    {}", withdrawal.purpose);
    println!("Withdrawer: {SELF_WITHDRAWER}");
    println!("Date:       {}", withdrawal.withdrawal_date.format(DATETIME_DISPLAY));
    println!("Tag:        {tag}");
    println!("Recorded:   {}", withdrawal.created_at.format(DATETIME_DISPLAY));
    Ok(())
}

pub fn edit(
    id: i64,
    purpose: Option<String>,
    date: Option<NaiveDateTime>,
    tag: Option<i64>,
    clear_tag: bool,
) -> Result<()> {
    let conn = open_db()?;
    let withdrawal = balance::update_withdrawal(
        &conn,
        id,
        TransactionEdit {
            purpose,
            depositor: None,
            date,
            tag: tag_change(tag, clear_tag),
        },
    )?;
    println!("Updated withdrawal {}: {}", withdrawal.id, withdrawal.purpose);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let mut conn = open_db()?;
    let withdrawal = balance::delete_withdrawal(&mut conn, id, now())?;
    let card = get_card(&conn, withdrawal.bank_card_id)?;
    println!(
        "Deleted withdrawal {id} of {}. {card} balance: {}",
        money(withdrawal.amount),
        money(card.balance)
    );
    Ok(())
}
