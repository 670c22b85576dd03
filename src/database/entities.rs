use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, params};

use super::connection::DbConn;
use super::models::EntityQuery;
use crate::domain::{Entity, EntityId};

const MATCHING: &str = "(?1 IS NULL OR title LIKE '%' || ?1 || '%' ESCAPE '\\') \
     AND (?2 IS NULL OR category = ?2 COLLATE NOCASE)";

pub fn insert_entity(conn: &mut DbConn, entity: &Entity) -> Result<Entity> {
    let sql = "INSERT INTO entities (id, title, category) VALUES (?1, ?2, ?3) \
               RETURNING id, title, category";

    conn.query_row(
        sql,
        params![entity.id, entity.title, entity.category],
        parse_entity_row,
    )
    .context("Failed to insert entity")
}

pub fn find_by_id(conn: &mut DbConn, id: &EntityId) -> Result<Option<Entity>> {
    let sql = "SELECT id, title, category FROM entities WHERE id = ?1";

    conn.query_row(sql, params![id], parse_entity_row)
        .optional()
        .context("Failed to query entity by id")
}

pub fn search_entities(conn: &mut DbConn, query: &EntityQuery) -> Result<Vec<Entity>> {
    let sql = format!(
        "SELECT id, title, category FROM entities WHERE {MATCHING} \
         ORDER BY title COLLATE NOCASE, id LIMIT ?3 OFFSET ?4"
    );
    let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
    let offset = i64::try_from(query.offset).context("Offset out of range")?;
    let title = query.title.as_deref().map(escape_like);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![title, query.category, limit, offset],
            parse_entity_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to search entities")?;

    Ok(rows)
}

pub fn count_entities(conn: &mut DbConn, query: &EntityQuery) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM entities WHERE {MATCHING}");
    let title = query.title.as_deref().map(escape_like);

    let count: i64 = conn
        .query_row(&sql, params![title, query.category], |row| row.get(0))
        .context("Failed to count entities")?;
    Ok(count as u64)
}

/// Title filters are literal text, so LIKE wildcards in them are escaped.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn parse_entity_row(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
    })
}
