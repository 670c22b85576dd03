use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, params};

use super::connection::DbConn;
use super::models::ListOptions;
use crate::domain::{EntityId, Vote, VoteId, VoterId, models::round2};

const VOTE_COLUMNS: &str = "id, voter_id, entity_id, score, comment, created_at, updated_at";

pub fn insert_vote(conn: &mut DbConn, vote: &Vote) -> Result<Vote> {
    let sql = format!(
        "INSERT INTO votes ({VOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         RETURNING {VOTE_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            vote.id,
            vote.voter_id,
            vote.entity_id,
            vote.score,
            vote.comment,
            vote.created_at,
            vote.updated_at
        ],
        parse_vote_row,
    )
    .context("Failed to insert vote")
}

pub fn find_by_id(conn: &mut DbConn, id: &VoteId) -> Result<Option<Vote>> {
    let sql = format!("SELECT {VOTE_COLUMNS} FROM votes WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_vote_row)
        .optional()
        .context("Failed to query vote by id")
}

pub fn find_by_voter_and_entity(
    conn: &mut DbConn,
    voter_id: &VoterId,
    entity_id: &EntityId,
) -> Result<Option<Vote>> {
    let sql = format!("SELECT {VOTE_COLUMNS} FROM votes WHERE voter_id = ?1 AND entity_id = ?2");

    conn.query_row(&sql, params![voter_id, entity_id], parse_vote_row)
        .optional()
        .context("Failed to query vote by voter and entity")
}

pub fn list_by_voter(
    conn: &mut DbConn,
    voter_id: &VoterId,
    options: &ListOptions,
) -> Result<Vec<Vote>> {
    list_where(conn, "voter_id", voter_id.as_str(), options)
        .context("Failed to list votes by voter")
}

pub fn list_by_entity(
    conn: &mut DbConn,
    entity_id: &EntityId,
    options: &ListOptions,
) -> Result<Vec<Vote>> {
    list_where(conn, "entity_id", entity_id.as_str(), options)
        .context("Failed to list votes by entity")
}

/// `column` is never user input; only the two call sites above pass it.
fn list_where(
    conn: &mut DbConn,
    column: &str,
    value: &str,
    options: &ListOptions,
) -> Result<Vec<Vote>> {
    let sql = format!(
        "SELECT {VOTE_COLUMNS} FROM votes WHERE {column} = ?1 \
         ORDER BY {sort} {order}, id {order} LIMIT ?2 OFFSET ?3",
        sort = options.sort_by.as_sql(),
        order = options.order.as_sql(),
    );
    let limit = options.limit.map(|l| l as i64).unwrap_or(-1);
    let offset = i64::try_from(options.offset).context("Offset out of range")?;

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![value, limit, offset], parse_vote_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_by_voter(conn: &mut DbConn, voter_id: &VoterId) -> Result<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM votes WHERE voter_id = ?1",
            params![voter_id],
            |row| row.get(0),
        )
        .context("Failed to count votes by voter")?;
    Ok(count as u64)
}

pub fn count_by_entity(conn: &mut DbConn, entity_id: &EntityId) -> Result<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM votes WHERE entity_id = ?1",
            params![entity_id],
            |row| row.get(0),
        )
        .context("Failed to count votes by entity")?;
    Ok(count as u64)
}

pub fn update_vote(conn: &mut DbConn, vote: &Vote) -> Result<Option<Vote>> {
    let sql = format!(
        "UPDATE votes SET score = ?2, comment = ?3, updated_at = ?4 WHERE id = ?1 \
         RETURNING {VOTE_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![vote.id, vote.score, vote.comment, vote.updated_at],
        parse_vote_row,
    )
    .optional()
    .context("Failed to update vote")
}

/// Returns whether a row was removed.
pub fn delete_vote(conn: &mut DbConn, id: &VoteId) -> Result<bool> {
    let removed = conn
        .execute("DELETE FROM votes WHERE id = ?1", params![id])
        .context("Failed to delete vote")?;
    Ok(removed > 0)
}

/// `(score, number of votes)` for every score the entity has received.
pub fn score_counts(conn: &mut DbConn, entity_id: &EntityId) -> Result<Vec<(u8, u64)>> {
    let sql = "SELECT score, COUNT(*) FROM votes WHERE entity_id = ?1 GROUP BY score";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![entity_id], |row| {
            let score: u8 = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((score, count as u64))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to aggregate entity scores")?;

    Ok(rows)
}

pub fn global_mean(conn: &mut DbConn) -> Result<Option<f64>> {
    let mean: Option<f64> = conn
        .query_row("SELECT AVG(score) FROM votes", [], |row| row.get(0))
        .context("Failed to compute global mean score")?;
    Ok(mean.map(round2))
}

fn parse_vote_row(row: &rusqlite::Row) -> rusqlite::Result<Vote> {
    Ok(Vote {
        id: row.get(0)?,
        voter_id: row.get(1)?,
        entity_id: row.get(2)?,
        score: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
