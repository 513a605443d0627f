use anyhow::Result;
use reveal_types::models::MediaAsset;
use rusqlite::{Connection, Row};

use super::{OptionalExt, enum_col, uuid_col};

const COLUMNS: &str = "public_id, owner_id, kind, url, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<MediaAsset> {
    Ok(MediaAsset {
        public_id: row.get(0)?,
        owner_id: uuid_col(row, 1)?,
        kind: enum_col(row, 2)?,
        url: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn insert(conn: &Connection, asset: &MediaAsset) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO media_assets ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        rusqlite::params![
            asset.public_id,
            asset.owner_id.to_string(),
            asset.kind.as_str(),
            asset.url,
            asset.created_at,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, public_id: &str) -> Result<Option<MediaAsset>> {
    let sql = format!("SELECT {COLUMNS} FROM media_assets WHERE public_id = ?1");
    conn.query_row(&sql, [public_id], map_row).optional()
}

pub fn delete(conn: &Connection, public_id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM media_assets WHERE public_id = ?1", [public_id])?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::queries::fixtures;
    use chrono::Utc;
    use reveal_types::models::MediaKind;

    #[test]
    fn assets_are_keyed_by_public_id() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| {
            let owner = fixtures::user(c, "ana@example.com");
            let asset = MediaAsset {
                public_id: "reveal/abc".into(),
                owner_id: owner.id,
                kind: MediaKind::Video,
                url: "https://cdn.example.com/abc.mp4".into(),
                created_at: Utc::now(),
            };
            insert(c, &asset)?;

            let found = find(c, "reveal/abc")?.expect("asset");
            assert_eq!(found.owner_id, owner.id);
            assert_eq!(found.kind, MediaKind::Video);

            assert!(delete(c, "reveal/abc")?);
            assert!(!delete(c, "reveal/abc")?);
            assert!(find(c, "reveal/abc")?.is_none());
            Ok(())
        })
        .unwrap();
    }
}
