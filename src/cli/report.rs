use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, paint};
use crate::error::Result;
use crate::fmt::money;
use crate::reports;

pub fn dashboard() -> Result<()> {
    let conn = open_db()?;
    let s = reports::get_dashboard_summary(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Value"]);
    table.add_row(vec![Cell::new("Bank cards"), Cell::new(s.card_count)]);
    table.add_row(vec![Cell::new("Total balance".bold()), Cell::new(money(s.total_balance))]);
    table.add_row(vec![
        Cell::new("Total deposits".green()),
        Cell::new(money(s.total_deposits)),
    ]);
    table.add_row(vec![
        Cell::new("Total withdrawals".red()),
        Cell::new(money(s.total_withdrawals)),
    ]);
    println!("Dashboard\n{table}");
    Ok(())
}

pub fn tags() -> Result<()> {
    let conn = open_db()?;
    let summary = reports::get_tag_summary(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Tag", "Deposits", "Withdrawals", "Net"]);
    for t in &summary.tags {
        let net = if t.net.is_sign_negative() && !t.net.is_zero() {
            money(t.net).red().to_string()
        } else {
            money(t.net).green().to_string()
        };
        table.add_row(vec![
            Cell::new(paint(&t.name, &t.color)),
            Cell::new(money(t.deposits)),
            Cell::new(money(t.withdrawals)),
            Cell::new(net),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(summary.total_deposits)),
        Cell::new(money(summary.total_withdrawals)),
        Cell::new(money(summary.total_deposits - summary.total_withdrawals)),
    ]);
    println!("Tag Summary\n{table}");
    Ok(())
}
