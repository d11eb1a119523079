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
        info!("DB: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id            TEXT PRIMARY KEY,
                subject       TEXT NOT NULL UNIQUE,
                email         TEXT NOT NULL UNIQUE,
                display_name  TEXT,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE campaigns (
                id            TEXT PRIMARY KEY,
                name          TEXT NOT NULL,
                description   TEXT,
                created_by    TEXT NOT NULL REFERENCES users(id),
                is_deleted    INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE campaign_members (
                campaign_id   TEXT NOT NULL REFERENCES campaigns(id),
                user_id       TEXT NOT NULL REFERENCES users(id),
                role          TEXT NOT NULL CHECK (role IN ('gm', 'player')),
                joined_at     TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (campaign_id, user_id)
            );

            CREATE TABLE characters (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL REFERENCES users(id),
                gm_user_id    TEXT REFERENCES users(id),
                campaign_id   TEXT REFERENCES campaigns(id),
                name          TEXT,
                data          TEXT NOT NULL,
                is_deleted    INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_characters_owner    ON characters(user_id);
            CREATE INDEX idx_characters_gm       ON characters(gm_user_id);
            CREATE INDEX idx_characters_campaign ON characters(campaign_id);

            CREATE TABLE encounters (
                id            TEXT PRIMARY KEY,
                campaign_id   TEXT NOT NULL REFERENCES campaigns(id),
                name          TEXT,
                data          TEXT NOT NULL,
                created_by    TEXT NOT NULL REFERENCES users(id),
                is_deleted    INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_encounters_campaign ON encounters(campaign_id);

            CREATE TABLE projects (
                id            TEXT PRIMARY KEY,
                campaign_id   TEXT NOT NULL REFERENCES campaigns(id),
                name          TEXT NOT NULL,
                points        INTEGER NOT NULL DEFAULT 0,
                data          TEXT,
                created_by    TEXT NOT NULL REFERENCES users(id),
                is_deleted    INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_projects_campaign ON projects(campaign_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
