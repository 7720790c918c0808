use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cards;
use crate::cli::{now, open_db, DATETIME_DISPLAY};
use crate::error::Result;
use crate::fmt::money;
use crate::reports;

pub fn add(bank_name: &str, card_number: &str) -> Result<()> {
    let conn = open_db()?;
    let card = cards::create_card(&conn, bank_name, card_number, now())?;
    println!("Added card {}: {card}", card.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let list = reports::list_bank_cards(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Bank", "Card Number", "Balance", "Created", "Updated"]);
    for card in &list.cards {
        table.add_row(vec![
            Cell::new(card.id),
            Cell::new(&card.bank_name),
            Cell::new(&card.card_number),
            Cell::new(money(card.balance)),
            Cell::new(card.created_at.format(DATETIME_DISPLAY)),
            Cell::new(card.updated_at.format(DATETIME_DISPLAY)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(list.total_balance)),
        Cell::new(""),
        Cell::new(""),
    ]);
    println!("Bank Cards\n{table}");
    Ok(())
}

pub fn edit(id: i64, bank_name: Option<&str>, card_number: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let card = cards::update_card(&conn, id, bank_name, card_number, now())?;
    println!("Updated card {id}: {card}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let mut conn = open_db()?;
    let deletion = cards::delete_card(&mut conn, id)?;
    println!(
        "Deleted card {id}: {} ({} deposits, {} withdrawals removed)",
        deletion.card, deletion.deposits_removed, deletion.withdrawals_removed
    );
    Ok(())
}

pub fn verify() -> Result<()> {
    let conn = open_db()?;
    let checks = cards::verify_balances(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Card", "Cached", "From Transactions", "Status"]);
    let mut drifted = 0usize;
    for check in &checks {
        let status = if check.is_consistent() {
            "OK".green()
        } else {
            drifted += 1;
            format!("off by {}", money(check.drift())).red()
        };
        table.add_row(vec![
            Cell::new(check.card.id),
            Cell::new(check.card.to_string()),
            Cell::new(money(check.card.balance)),
            Cell::new(money(check.computed)),
            Cell::new(status),
        ]);
    }
    println!("Balance Check\n{table}");
    if drifted == 0 {
        println!("All {} card balances match their transactions.", checks.len());
    } else {
        println!("{drifted} card balance(s) do not match their transactions.");
    }
    Ok(())
}
