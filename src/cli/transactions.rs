use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, paint, FilterArgs, DATETIME_DISPLAY};
use crate::error::Result;
use crate::feed::{self, FeedEntry};
use crate::fmt::money;
use crate::models::TransactionKind;

fn signed_amount(entry: &FeedEntry) -> String {
    match entry.kind {
        TransactionKind::Deposit => format!("+{}", money(entry.amount)).green().to_string(),
        TransactionKind::Withdrawal => format!("-{}", money(entry.amount)).red().to_string(),
    }
}

pub fn run(filter: &FilterArgs, page: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let page = feed::list_transactions(&conn, &filter.to_filter(), page)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Type", "ID", "Amount", "Card", "Tag", "Purpose", "By"]);
    for entry in &page.items {
        let tag = match &entry.tag {
            Some(t) => paint(&t.name, &t.color).to_string(),
            None => String::new(),
        };
        let by = entry
            .depositor
            .as_deref()
            .or(entry.withdrawer.as_deref())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(entry.date.format(DATETIME_DISPLAY)),
            Cell::new(entry.kind),
            Cell::new(entry.id),
            Cell::new(signed_amount(entry)),
            Cell::new(&entry.card_label),
            Cell::new(tag),
            Cell::new(&entry.purpose),
            Cell::new(by),
        ]);
    }
    println!("Transactions\n{table}");
    println!(
        "Page {} of {} ({} transactions)",
        page.number, page.num_pages, page.total
    );
    if page.has_previous() {
        println!("Previous: --page {}", page.number - 1);
    }
    if page.has_next() {
        println!("Next: --page {}", page.number + 1);
    }
    Ok(())
}
