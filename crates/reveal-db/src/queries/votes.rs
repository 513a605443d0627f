use anyhow::Result;
use reveal_types::models::{Guess, Vote, VoteTally};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, enum_col, uuid_col};

const COLUMNS: &str = "id, event_id, voter_id, guess, justification, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    Ok(Vote {
        id: uuid_col(row, 0)?,
        event_id: uuid_col(row, 1)?,
        voter_id: uuid_col(row, 2)?,
        guess: enum_col(row, 3)?,
        justification: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Fails with a UNIQUE violation when the voter already voted on the event.
pub fn insert(conn: &Connection, vote: &Vote) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO votes ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        rusqlite::params![
            vote.id.to_string(),
            vote.event_id.to_string(),
            vote.voter_id.to_string(),
            vote.guess.as_str(),
            vote.justification,
            vote.created_at,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: Uuid) -> Result<Option<Vote>> {
    let sql = format!("SELECT {COLUMNS} FROM votes WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], map_row).optional()
}

pub fn find_for_voter(conn: &Connection, event_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>> {
    let sql = format!("SELECT {COLUMNS} FROM votes WHERE event_id = ?1 AND voter_id = ?2");
    conn.query_row(&sql, [event_id.to_string(), voter_id.to_string()], map_row)
        .optional()
}

pub fn exists(conn: &Connection, event_id: Uuid, voter_id: Uuid) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM votes WHERE event_id = ?1 AND voter_id = ?2)",
        [event_id.to_string(), voter_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(found == 1)
}

pub fn list_for_event(conn: &Connection, event_id: Uuid) -> Result<Vec<Vote>> {
    let sql = format!("SELECT {COLUMNS} FROM votes WHERE event_id = ?1 ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([event_id.to_string()], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_by_voter(conn: &Connection, voter_id: Uuid) -> Result<Vec<Vote>> {
    let sql = format!("SELECT {COLUMNS} FROM votes WHERE voter_id = ?1 ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([voter_id.to_string()], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrites guess and justification; id and created_at are untouched.
pub fn update(
    conn: &Connection,
    id: Uuid,
    guess: Guess,
    justification: Option<&str>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE votes SET guess = ?2, justification = ?3 WHERE id = ?1",
        rusqlite::params![id.to_string(), guess.as_str(), justification],
    )?;
    Ok(changed == 1)
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<bool> {
    let changed = conn.execute("DELETE FROM votes WHERE id = ?1", [id.to_string()])?;
    Ok(changed == 1)
}

pub fn count_by_event(conn: &Connection, event_id: Uuid) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM votes WHERE event_id = ?1",
        [event_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

pub fn count_by_event_and_guess(conn: &Connection, event_id: Uuid, guess: Guess) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM votes WHERE event_id = ?1 AND guess = ?2",
        [event_id.to_string(), guess.as_str().to_string()],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

/// All three counts in one pass.
pub fn tally(conn: &Connection, event_id: Uuid) -> Result<VoteTally> {
    let (total, boy, girl): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(guess = 'BOY'), 0),
                COALESCE(SUM(guess = 'GIRL'), 0)
         FROM votes WHERE event_id = ?1",
        [event_id.to_string()],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    Ok(VoteTally {
        total: total as u64,
        boy: boy as u64,
        girl: girl as u64,
    })
}
