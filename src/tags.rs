use chrono::NaiveDateTime;
use rusqlite::{Connection, Row};

use crate::error::{not_found, CardbookError, Result};
use crate::models::{require_text, to_seconds, validate_color, Tag, DEFAULT_TAG_COLOR, MAX_TAG_NAME};

const TAG_COLUMNS: &str = "id, name, color, created_at";

fn map_tag(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn name_taken(conn: &Connection, name: &str, except_id: Option<i64>) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE name = ?1 AND id != ?2)",
        rusqlite::params![name, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn create_tag(conn: &Connection, name: &str, color: Option<&str>, now: NaiveDateTime) -> Result<Tag> {
    let name = require_text("tag name", name, MAX_TAG_NAME)?;
    let color = validate_color(color.unwrap_or(DEFAULT_TAG_COLOR))?;
    if name_taken(conn, &name, None)? {
        return Err(CardbookError::validation(format!("tag name already exists: {name}")));
    }
    conn.execute(
        "INSERT INTO tags (name, color, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, color, to_seconds(now)],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(tag_id = id, %name, "created tag");
    get_tag(conn, id)
}

pub fn get_tag(conn: &Connection, id: i64) -> Result<Tag> {
    conn.query_row(
        &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
        [id],
        map_tag,
    )
    .map_err(not_found("Tag", id))
}

pub fn all_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name"))?;
    let tags = stmt
        .query_map([], map_tag)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub fn update_tag(conn: &Connection, id: i64, name: Option<&str>, color: Option<&str>) -> Result<Tag> {
    let current = get_tag(conn, id)?;
    let name = match name {
        Some(n) => require_text("tag name", n, MAX_TAG_NAME)?,
        None => current.name,
    };
    let color = match color {
        Some(c) => validate_color(c)?,
        None => current.color,
    };
    if name_taken(conn, &name, Some(id))? {
        return Err(CardbookError::validation(format!("tag name already exists: {name}")));
    }
    conn.execute(
        "UPDATE tags SET name = ?1, color = ?2 WHERE id = ?3",
        rusqlite::params![name, color, id],
    )?;
    tracing::info!(tag_id = id, "updated tag");
    get_tag(conn, id)
}

pub struct TagDeletion {
    pub tag: Tag,
    /// Deposits and withdrawals that lost the tag.
    pub untagged: i64,
}

/// Delete a tag. Transactions that carried it are kept and become untagged.
pub fn delete_tag(conn: &mut Connection, id: i64) -> Result<TagDeletion> {
    let tx = conn.transaction()?;
    let tag = get_tag(&tx, id)?;
    let untagged: i64 = tx.query_row(
        "SELECT (SELECT count(*) FROM deposits WHERE tag_id = ?1) \
         + (SELECT count(*) FROM withdrawals WHERE tag_id = ?1)",
        [id],
        |r| r.get(0),
    )?;
    tx.execute("DELETE FROM tags WHERE id = ?1", [id])?;
    tx.commit()?;
    tracing::info!(tag_id = id, untagged, "deleted tag");
    Ok(TagDeletion { tag, untagged })
}
