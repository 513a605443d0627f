use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash   TEXT NOT NULL,
                photo_url       TEXT,
                role            TEXT NOT NULL DEFAULT 'GUEST',
                active          INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE events (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                description     TEXT,
                event_date      TEXT NOT NULL,
                location        TEXT,
                mother_name     TEXT NOT NULL,
                father_name     TEXT NOT NULL,
                revealed        INTEGER NOT NULL DEFAULT 0,
                result          TEXT,
                status          TEXT NOT NULL DEFAULT 'ACTIVE',
                voting_closed   INTEGER NOT NULL DEFAULT 0,
                voting_deadline TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                CHECK ((revealed = 0 AND result IS NULL)
                    OR (revealed = 1 AND result IS NOT NULL AND voting_closed = 1))
            );

            CREATE INDEX idx_events_owner ON events(owner_id, event_date);

            CREATE TABLE votes (
                id              TEXT PRIMARY KEY,
                event_id        TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                voter_id        TEXT NOT NULL REFERENCES users(id),
                guess           TEXT NOT NULL,
                justification   TEXT,
                created_at      TEXT NOT NULL,
                UNIQUE(event_id, voter_id)
            );

            CREATE INDEX idx_votes_voter ON votes(voter_id, created_at);

            CREATE TABLE gallery_posts (
                id              TEXT PRIMARY KEY,
                event_id        TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                author_id       TEXT NOT NULL REFERENCES users(id),
                message         TEXT,
                photo_url       TEXT,
                video_url       TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_gallery_event ON gallery_posts(event_id, created_at);

            CREATE TABLE password_reset_tokens (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL UNIQUE REFERENCES users(id),
                token_hash      TEXT NOT NULL UNIQUE,
                expires_at      TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (media ownership)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE media_assets (
                public_id       TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                kind            TEXT NOT NULL,
                url             TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_media_owner ON media_assets(owner_id);

            INSERT INTO schema_version (version) VALUES (2);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'events', 'votes', 'gallery_posts',
                              'password_reset_tokens', 'media_assets')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }
}
