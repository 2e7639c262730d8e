use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password    TEXT NOT NULL,
            full_name   TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id              TEXT PRIMARY KEY,
            creator_id      TEXT NOT NULL,
            name            TEXT NOT NULL,
            \"type\"        TEXT NOT NULL,
            description     TEXT,
            event_date      TEXT NOT NULL,
            location        TEXT NOT NULL,
            budget          REAL,
            max_attendees   INTEGER CHECK (max_attendees IS NULL OR max_attendees >= 0),
            image_url       TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_date
            ON events(event_date);

        CREATE TABLE IF NOT EXISTS event_registrations (
            id              TEXT PRIMARY KEY,
            event_id        TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL,
            registered_at   TEXT NOT NULL,
            UNIQUE(event_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS vendors (
            id              TEXT PRIMARY KEY,
            creator_id      TEXT NOT NULL,
            name            TEXT NOT NULL,
            \"type\"        TEXT NOT NULL CHECK (\"type\" IN
                ('caterer', 'decorator', 'photographer', 'musician', 'florist', 'planner', 'other')),
            description     TEXT,
            email           TEXT,
            phone           TEXT,
            price_range     TEXT,
            rating          REAL,
            image_url       TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS venues (
            id              TEXT PRIMARY KEY,
            creator_id      TEXT NOT NULL,
            name            TEXT NOT NULL,
            address         TEXT NOT NULL,
            city            TEXT NOT NULL,
            capacity        INTEGER NOT NULL CHECK (capacity > 0),
            price_per_hour  REAL,
            description     TEXT,
            amenities       TEXT,
            image_url       TEXT,
            is_available    INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            title       TEXT NOT NULL,
            message     TEXT NOT NULL,
            \"type\"    TEXT NOT NULL DEFAULT 'info',
            is_read     INTEGER NOT NULL DEFAULT 0,
            link        TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
