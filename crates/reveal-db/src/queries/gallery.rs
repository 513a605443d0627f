use anyhow::Result;
use reveal_types::models::GalleryPost;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, uuid_col};

const COLUMNS: &str = "id, event_id, author_id, message, photo_url, video_url, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<GalleryPost> {
    Ok(GalleryPost {
        id: uuid_col(row, 0)?,
        event_id: uuid_col(row, 1)?,
        author_id: uuid_col(row, 2)?,
        message: row.get(3)?,
        photo_url: row.get(4)?,
        video_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert(conn: &Connection, post: &GalleryPost) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO gallery_posts ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        rusqlite::params![
            post.id.to_string(),
            post.event_id.to_string(),
            post.author_id.to_string(),
            post.message,
            post.photo_url,
            post.video_url,
            post.created_at,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: Uuid) -> Result<Option<GalleryPost>> {
    let sql = format!("SELECT {COLUMNS} FROM gallery_posts WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], map_row).optional()
}

pub fn list(conn: &Connection) -> Result<Vec<GalleryPost>> {
    let sql = format!("SELECT {COLUMNS} FROM gallery_posts ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_for_event(conn: &Connection, event_id: Uuid) -> Result<Vec<GalleryPost>> {
    let sql =
        format!("SELECT {COLUMNS} FROM gallery_posts WHERE event_id = ?1 ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([event_id.to_string()], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_by_author(conn: &Connection, author_id: Uuid) -> Result<Vec<GalleryPost>> {
    let sql =
        format!("SELECT {COLUMNS} FROM gallery_posts WHERE author_id = ?1 ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([author_id.to_string()], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<bool> {
    let changed = conn.execute("DELETE FROM gallery_posts WHERE id = ?1", [id.to_string()])?;
    Ok(changed == 1)
}
