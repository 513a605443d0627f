use anyhow::Result;
use chrono::{DateTime, Utc};
use reveal_types::models::User;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, enum_col, uuid_col};
use crate::models::UserRow;

const COLUMNS: &str =
    "id, name, email, password_hash, photo_url, role, active, created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user: User {
            id: uuid_col(row, 0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            photo_url: row.get(4)?,
            role: enum_col(row, 5)?,
            active: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        },
        password_hash: row.get(3)?,
    })
}

pub fn insert(conn: &Connection, user: &User, password_hash: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, photo_url, role, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            user.id.to_string(),
            user.name,
            user.email,
            password_hash,
            user.photo_url,
            user.role.as_str(),
            user.active,
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: Uuid) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], map_row).optional()
}

/// Case-insensitive through the column's NOCASE collation.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE email = ?1");
    conn.query_row(&sql, [email], map_row).optional()
}

pub fn find_active_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE email = ?1 AND active = 1");
    conn.query_row(&sql, [email], map_row).optional()
}

pub fn list(conn: &Connection) -> Result<Vec<User>> {
    let sql = format!("SELECT {COLUMNS} FROM users ORDER BY created_at");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| map_row(row).map(|r| r.user))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_profile(
    conn: &Connection,
    id: Uuid,
    name: &str,
    email: &str,
    photo_url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET name = ?2, email = ?3, photo_url = ?4, updated_at = ?5
         WHERE id = ?1",
        rusqlite::params![id.to_string(), name, email, photo_url, now],
    )?;
    Ok(changed == 1)
}

pub fn update_password(
    conn: &Connection,
    id: Uuid,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        rusqlite::params![id.to_string(), password_hash, now],
    )?;
    Ok(changed == 1)
}

pub fn set_active(conn: &Connection, id: Uuid, active: bool, now: DateTime<Utc>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET active = ?2, updated_at = ?3 WHERE id = ?1",
        rusqlite::params![id.to_string(), active, now],
    )?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::queries::fixtures;

    #[test]
    fn email_lookup_ignores_case() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            let user = fixtures::user(c, "maria@example.com");
            let found = find_by_email(c, "Maria@Example.COM")?.expect("user");
            assert_eq!(found.user.id, user.id);
            assert_eq!(found.password_hash, "hash");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn inactive_users_are_hidden_from_active_lookup() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            let user = fixtures::user(c, "joao@example.com");
            assert!(set_active(c, user.id, false, Utc::now())?);
            assert!(find_active_by_email(c, "joao@example.com")?.is_none());
            assert!(find_by_email(c, "joao@example.com")?.is_some());
            Ok(())
        })
        .unwrap();
    }
}
