use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, uuid_col};
use crate::models::ResetTokenRow;

const COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<ResetTokenRow> {
    Ok(ResetTokenRow {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        token_hash: row.get(2)?,
        expires_at: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Returns how many tokens were removed (0 or 1).
pub fn delete_for_user(conn: &Connection, user_id: Uuid) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM password_reset_tokens WHERE user_id = ?1",
        [user_id.to_string()],
    )?)
}

pub fn insert(conn: &Connection, token: &ResetTokenRow) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO password_reset_tokens ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        rusqlite::params![
            token.id.to_string(),
            token.user_id.to_string(),
            token.token_hash,
            token.expires_at,
            token.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_hash(conn: &Connection, token_hash: &str) -> Result<Option<ResetTokenRow>> {
    let sql = format!("SELECT {COLUMNS} FROM password_reset_tokens WHERE token_hash = ?1");
    conn.query_row(&sql, [token_hash], map_row).optional()
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<bool> {
    let changed =
        conn.execute("DELETE FROM password_reset_tokens WHERE id = ?1", [id.to_string()])?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use crate::{Database, is_unique_violation};
    use chrono::{Duration, Utc};

    fn token(user_id: Uuid, hash: &str) -> ResetTokenRow {
        let now = Utc::now();
        ResetTokenRow {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash.into(),
            expires_at: now + Duration::minutes(30),
            created_at: now,
        }
    }

    #[test]
    fn one_token_per_user() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            let user = fixtures::user(c, "ana@example.com");
            insert(c, &token(user.id, "aaa"))?;

            let err = insert(c, &token(user.id, "bbb")).unwrap_err();
            assert!(is_unique_violation(&err));

            assert_eq!(delete_for_user(c, user.id)?, 1);
            insert(c, &token(user.id, "bbb"))?;
            assert!(find_by_hash(c, "aaa")?.is_none());
            assert!(find_by_hash(c, "bbb")?.is_some());
            Ok(())
        })
        .unwrap();
    }
}
