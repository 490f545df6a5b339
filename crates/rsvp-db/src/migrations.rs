use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'guest'
                            CHECK (role IN ('guest', 'editor', 'admin')),
                created_at  TEXT NOT NULL
            );

            -- Singleton: the fixed key makes a second row impossible.
            CREATE TABLE wedding_event (
                id                INTEGER PRIMARY KEY CHECK (id = 1),
                title             TEXT NOT NULL,
                date              TEXT NOT NULL,
                time              TEXT,
                location          TEXT NOT NULL,
                location_details  TEXT,
                program           TEXT,
                dresscode         TEXT,
                additional_info   TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE TABLE rsvps (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id           TEXT NOT NULL UNIQUE REFERENCES users(id),
                attending         INTEGER NOT NULL,
                allergies         TEXT,
                food_preferences  TEXT,
                message           TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE TABLE additional_guests (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                rsvp_id           INTEGER NOT NULL UNIQUE REFERENCES rsvps(id),
                name              TEXT NOT NULL,
                attending         INTEGER NOT NULL,
                allergies         TEXT,
                food_preferences  TEXT,
                created_at        TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
