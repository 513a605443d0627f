use anyhow::Result;
use chrono::{DateTime, Utc};
use reveal_types::models::{Event, Guess};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, enum_col, opt_enum_col, uuid_col};

const COLUMNS: &str = "id, owner_id, title, description, event_date, location, mother_name, \
     father_name, revealed, result, status, voting_closed, voting_deadline, created_at, updated_at";

/// Which events a listing should return. Every listing is newest event date first.
#[derive(Debug, Clone, Copy)]
pub enum EventFilter {
    All,
    Active,
    /// Active and not closed. Deadlines are checked by the caller.
    VotingOpen,
    Owner(Uuid),
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: uuid_col(row, 0)?,
        owner_id: uuid_col(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        event_date: row.get(4)?,
        location: row.get(5)?,
        mother_name: row.get(6)?,
        father_name: row.get(7)?,
        revealed: row.get(8)?,
        result: opt_enum_col(row, 9)?,
        status: enum_col(row, 10)?,
        voting_closed: row.get(11)?,
        voting_deadline: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub fn insert(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO events ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"),
        rusqlite::params![
            event.id.to_string(),
            event.owner_id.to_string(),
            event.title,
            event.description,
            event.event_date,
            event.location,
            event.mother_name,
            event.father_name,
            event.revealed,
            event.result.map(|g| g.as_str()),
            event.status.as_str(),
            event.voting_closed,
            event.voting_deadline,
            event.created_at,
            event.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: Uuid) -> Result<Option<Event>> {
    let sql = format!("SELECT {COLUMNS} FROM events WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], map_row).optional()
}

pub fn list(conn: &Connection, filter: EventFilter) -> Result<Vec<Event>> {
    let (clause, owner) = match filter {
        EventFilter::All => ("", None),
        EventFilter::Active => ("WHERE status = 'ACTIVE'", None),
        EventFilter::VotingOpen => ("WHERE status = 'ACTIVE' AND voting_closed = 0", None),
        EventFilter::Owner(owner_id) => ("WHERE owner_id = ?1", Some(owner_id.to_string())),
    };
    let sql = format!("SELECT {COLUMNS} FROM events {clause} ORDER BY event_date DESC");
    let mut stmt = conn.prepare(&sql)?;

    let rows = match owner {
        Some(owner_id) => stmt.query_map([owner_id], map_row)?,
        None => stmt.query_map([], map_row)?,
    }
    .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Rewrites the organizer-editable columns.
pub fn update_details(conn: &Connection, event: &Event) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE events SET title = ?2, description = ?3, event_date = ?4, location = ?5,
             mother_name = ?6, father_name = ?7, voting_deadline = ?8, updated_at = ?9
         WHERE id = ?1",
        rusqlite::params![
            event.id.to_string(),
            event.title,
            event.description,
            event.event_date,
            event.location,
            event.mother_name,
            event.father_name,
            event.voting_deadline,
            event.updated_at,
        ],
    )?;
    Ok(changed == 1)
}

/// Sets result, revealed and voting_closed in one statement.
pub fn reveal(conn: &Connection, id: Uuid, result: Guess, now: DateTime<Utc>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE events SET result = ?2, revealed = 1, voting_closed = 1, updated_at = ?3
         WHERE id = ?1",
        rusqlite::params![id.to_string(), result.as_str(), now],
    )?;
    Ok(changed == 1)
}

pub fn close_voting(conn: &Connection, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE events SET voting_closed = 1, updated_at = ?2 WHERE id = ?1",
        rusqlite::params![id.to_string(), now],
    )?;
    Ok(changed == 1)
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<bool> {
    let changed = conn.execute("DELETE FROM events WHERE id = ?1", [id.to_string()])?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::queries::fixtures;

    #[test]
    fn reveal_sets_all_three_columns() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            let owner = fixtures::user(c, "owner@example.com");
            let event = fixtures::event(c, &owner);

            assert!(reveal(c, event.id, Guess::Girl, Utc::now())?);

            let stored = find(c, event.id)?.expect("event");
            assert!(stored.revealed);
            assert!(stored.voting_closed);
            assert_eq!(stored.result, Some(Guess::Girl));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn check_constraint_rejects_half_revealed_rows() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            let owner = fixtures::user(c, "owner@example.com");
            let event = fixtures::event(c, &owner);

            let res = c.execute(
                "UPDATE events SET revealed = 1 WHERE id = ?1",
                [event.id.to_string()],
            );
            assert!(res.is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn owner_filter_only_returns_own_events() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            let a = fixtures::user(c, "a@example.com");
            let b = fixtures::user(c, "b@example.com");
            fixtures::event(c, &a);
            fixtures::event(c, &a);
            fixtures::event(c, &b);

            assert_eq!(list(c, EventFilter::Owner(a.id))?.len(), 2);
            assert_eq!(list(c, EventFilter::All)?.len(), 3);

            let closed = fixtures::event(c, &b);
            close_voting(c, closed.id, Utc::now())?;
            assert_eq!(list(c, EventFilter::VotingOpen)?.len(), 3);
            Ok(())
        })
        .unwrap();
    }
}
