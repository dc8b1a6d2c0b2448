use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id           TEXT PRIMARY KEY,
            email        TEXT NOT NULL UNIQUE,
            password     TEXT NOT NULL,
            display_name TEXT,
            avatar_url   TEXT,
            is_admin     INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            type        TEXT NOT NULL CHECK (type IN ('image', 'video')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS media_assets (
            id             TEXT PRIMARY KEY,
            title          TEXT NOT NULL,
            description    TEXT,
            file_url       TEXT NOT NULL,
            format         TEXT NOT NULL,
            asset_type     TEXT NOT NULL CHECK (asset_type IN ('image', 'video')),
            category_id    INTEGER REFERENCES categories(id),
            uploader_id    TEXT REFERENCES profiles(id),
            is_recommended INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_media_assets_type
            ON media_assets(asset_type, created_at);

        CREATE INDEX IF NOT EXISTS idx_media_assets_category
            ON media_assets(category_id);

        CREATE TABLE IF NOT EXISTS saved_items (
            id             TEXT PRIMARY KEY,
            user_id        TEXT NOT NULL REFERENCES profiles(id),
            media_asset_id TEXT NOT NULL REFERENCES media_assets(id),
            created_at     TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, media_asset_id)
        );

        CREATE INDEX IF NOT EXISTS idx_saved_items_user
            ON saved_items(user_id, created_at);

        -- Seed starter categories so pickers are never empty
        INSERT OR IGNORE INTO categories (id, name, type) VALUES
            (1, 'Nature', 'image'),
            (2, 'People', 'image'),
            (3, 'Architecture', 'image'),
            (4, 'Ambient', 'video'),
            (5, 'Motion', 'video');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
