use std::io::Write;

use serde::Serialize;

use crate::cli::{open_db, FilterArgs};
use crate::error::Result;
use crate::feed::{self, FeedEntry};
use crate::models::TransactionKind;

#[derive(Serialize)]
struct TransactionRow<'a> {
    date: String,
    kind: TransactionKind,
    id: i64,
    amount: String,
    card: &'a str,
    tag: &'a str,
    purpose: &'a str,
    depositor: &'a str,
    withdrawer: &'a str,
}

impl<'a> From<&'a FeedEntry> for TransactionRow<'a> {
    fn from(entry: &'a FeedEntry) -> Self {
        Self {
            date: entry.date.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: entry.kind,
            id: entry.id,
            amount: entry.amount.to_string(),
            card: &entry.card_label,
            tag: entry.tag.as_ref().map(|t| t.name.as_str()).unwrap_or_default(),
            purpose: &entry.purpose,
            depositor: entry.depositor.as_deref().unwrap_or_default(),
            withdrawer: entry.withdrawer.as_deref().unwrap_or_default(),
        }
    }
}

pub(crate) fn write_transactions<W: Write>(out: W, entries: &[FeedEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for entry in entries {
        wtr.serialize(TransactionRow::from(entry))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn transactions(filter: &FilterArgs, output: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let entries = feed::collect_transactions(&conn, &filter.to_filter())?;
    match output {
        Some(path) => {
            write_transactions(std::fs::File::create(&path)?, &entries)?;
            println!("Exported {} transactions to {path}", entries.len());
        }
        None => write_transactions(std::io::stdout().lock(), &entries)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::tests::{deposit, withdrawal};
    use crate::balance::{create_deposit, create_withdrawal};
    use crate::cards::create_card;
    use crate::cards::tests::at;
    use crate::db::test_db;
    use crate::feed::TransactionFilter;
    use rust_decimal_macros::dec;

    #[test]
    fn test_csv_export() {
        let (_dir, mut conn) = test_db();
        let card = create_card(&conn, "Mellat", "1111", at(1, 9)).unwrap();
        create_deposit(&mut conn, deposit(card.id, dec!(1000)), at(2, 9)).unwrap();
        create_withdrawal(&mut conn, withdrawal(card.id, dec!(300.5)), at(3, 9)).unwrap();

        let entries = feed::collect_transactions(&conn, &TransactionFilter::default()).unwrap();
        let mut buf = Vec::new();
        write_transactions(&mut buf, &entries).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,kind,id,amount,card,tag,purpose,depositor,withdrawer");
        assert_eq!(lines[1], "2025-01-03 09:00:00,withdrawal,1,300.50,Mellat - 1111,,rent,,self");
        assert_eq!(lines[2], "2025-01-02 09:00:00,deposit,1,1000.00,Mellat - 1111,,salary,ACME,");
        assert_eq!(lines.len(), 3);
    }
}
