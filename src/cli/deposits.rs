use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::balance;
use crate::cards::get_card;
use crate::cli::{now, open_db, tag_change, DATETIME_DISPLAY};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{NewDeposit, TransactionEdit};
use crate::tags::get_tag;

pub fn add(
    amount: Decimal,
    card: i64,
    purpose: &str,
    depositor: &str,
    date: Option<NaiveDateTime>,
    tag: Option<i64>,
) -> Result<()> {
    let mut conn = open_db()?;
    let deposit = balance::create_deposit(
        &mut conn,
        NewDeposit {
            amount,
            bank_card_id: card,
            purpose: purpose.to_string(),
            depositor: depositor.to_string(),
            deposit_date: date,
            tag_id: tag,
        },
        now(),
    )?;
    let card = get_card(&conn, deposit.bank_card_id)?;
    println!(
        "Recorded deposit {} of {} to {card}. New balance: {}",
        deposit.id,
        money(deposit.amount),
        money(card.balance)
    );
    Ok(())
}

pub fn show(id: i64) -> Result<()> {
    let conn = open_db()?;
    let deposit = balance::get_deposit(&conn, id)?;
    let card = get_card(&conn, deposit.bank_card_id)?;
    let tag = match deposit.tag_id {
        Some(tag_id) => get_tag(&conn, tag_id)?.name,
        None => "-".to_string(),
    };
    println!("Deposit {}", deposit.id);
    println!("Amount:     {}", money(deposit.amount));
    println!("Card:       {card}");
    println!("Purpose:    {}", deposit.purpose);
    println!("Depositor:  {}", deposit.depositor);
    println!("Date:       {}", deposit.deposit_date.format(DATETIME_DISPLAY));
    println!("Tag:        {tag}");
    println!("Recorded:   {}", deposit.created_at.format(DATETIME_DISPLAY));
    Ok(())
}

pub fn edit(
    id: i64,
    purpose: Option<String>,
    depositor: Option<String>,
    date: Option<NaiveDateTime>,
    tag: Option<i64>,
    clear_tag: bool,
) -> Result<()> {
    let conn = open_db()?;
    let deposit = balance::update_deposit(
        &conn,
        id,
        TransactionEdit {
            purpose,
            depositor,
            date,
            tag: tag_change(tag, clear_tag),
        },
    )?;
    println!("Updated deposit {}: {}", deposit.id, deposit.purpose);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let mut conn = open_db()?;
    let deposit = balance::delete_deposit(&mut conn, id, now())?;
    let card = get_card(&conn, deposit.bank_card_id)?;
    println!(
        "Deleted deposit {id} of {}. {card} balance: {}",
        money(deposit.amount),
        money(card.balance)
    );
    Ok(())
}
