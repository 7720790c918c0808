use comfy_table::{Cell, Table};

use crate::cli::{now, open_db, paint, DATETIME_DISPLAY};
use crate::error::Result;
use crate::tags;

pub fn add(name: &str, color: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let tag = tags::create_tag(&conn, name, color, now())?;
    println!("Added tag {}: {}", tag.id, paint(&tag.name, &tag.color));
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Color", "Created"]);
    for tag in tags::all_tags(&conn)? {
        table.add_row(vec![
            Cell::new(tag.id),
            Cell::new(paint(&tag.name, &tag.color)),
            Cell::new(&tag.color),
            Cell::new(tag.created_at.format(DATETIME_DISPLAY)),
        ]);
    }
    println!("Tags\n{table}");
    Ok(())
}

pub fn edit(id: i64, name: Option<&str>, color: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let tag = tags::update_tag(&conn, id, name, color)?;
    println!("Updated tag {id}: {} ({})", paint(&tag.name, &tag.color), tag.color);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let mut conn = open_db()?;
    let deletion = tags::delete_tag(&mut conn, id)?;
    println!(
        "Deleted tag {id}: {} ({} transactions untagged)",
        deletion.tag.name, deletion.untagged
    );
    Ok(())
}
