use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let cards: i64 = conn.query_row("SELECT count(*) FROM bank_cards", [], |r| r.get(0))?;
        let tags: i64 = conn.query_row("SELECT count(*) FROM tags", [], |r| r.get(0))?;
        let deposits: i64 = conn.query_row("SELECT count(*) FROM deposits", [], |r| r.get(0))?;
        let withdrawals: i64 = conn.query_row("SELECT count(*) FROM withdrawals", [], |r| r.get(0))?;

        println!();
        println!("Cards:         {cards}");
        println!("Tags:          {tags}");
        println!("Deposits:      {deposits}");
        println!("Withdrawals:   {withdrawals}");
    } else {
        println!();
        println!("Database not found. Run `cardbook init` to set up.");
    }

    Ok(())
}
