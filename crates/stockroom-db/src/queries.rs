use crate::Database;
use crate::models::{
    CategoryRow, MediaAssetPatch, MediaAssetRow, MediaFilter, NewMediaAsset, ProfileRow,
    SavedAssetRow,
};
use anyhow::Result;
use rusqlite::{Connection, types::ToSql};

const ASSET_COLUMNS: &str = "m.id, m.title, m.description, m.file_url, m.format, m.asset_type, \
     m.category_id, c.name, m.uploader_id, m.is_recommended, m.created_at";

impl Database {
    // -- Profiles --

    pub fn create_profile(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, email, password, display_name) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, email, password_hash, display_name],
            )?;
            Ok(())
        })
    }

    pub fn get_profile_by_email(&self, email: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "email", email))
    }

    pub fn get_profile_by_id(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "id", id))
    }

    /// The admin flag for a user, or None when no profile row exists.
    /// Read fresh on every call; the request gate depends on this never
    /// being cached.
    pub fn profile_is_admin(&self, id: &str) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT is_admin FROM profiles WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    pub fn set_admin(&self, id: &str, is_admin: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET is_admin = ?2 WHERE id = ?1",
                rusqlite::params![id, is_admin],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_display_name(&self, id: &str, display_name: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET display_name = ?2 WHERE id = ?1",
                rusqlite::params![id, display_name],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_avatar_url(&self, id: &str, avatar_url: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET avatar_url = ?2 WHERE id = ?1",
                rusqlite::params![id, avatar_url],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn count_profiles(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?)
        })
    }

    // -- Categories --

    pub fn list_categories(&self, kind: Option<&str>) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let (sql, params): (&str, Vec<&dyn ToSql>) = match kind {
                Some(ref k) => (
                    "SELECT id, name, type, created_at FROM categories WHERE type = ?1 ORDER BY name",
                    vec![k as &dyn ToSql],
                ),
                None => (
                    "SELECT id, name, type, created_at FROM categories ORDER BY name",
                    vec![],
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(CategoryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        kind: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Media assets --

    pub fn insert_media_asset(&self, asset: &NewMediaAsset<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO media_assets \
                 (id, title, description, file_url, format, asset_type, category_id, uploader_id, is_recommended) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    asset.id,
                    asset.title,
                    asset.description,
                    asset.file_url,
                    asset.format,
                    asset.asset_type,
                    asset.category_id,
                    asset.uploader_id,
                    asset.is_recommended,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_media_asset(&self, id: &str) -> Result<Option<MediaAssetRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ASSET_COLUMNS} FROM media_assets m \
                 LEFT JOIN categories c ON m.category_id = c.id WHERE m.id = ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row([id], asset_from_row).optional()
        })
    }

    pub fn list_media_assets(&self, filter: &MediaFilter) -> Result<Vec<MediaAssetRow>> {
        self.with_conn(|conn| query_media(conn, filter))
    }

    /// COALESCE-style partial update; returns false when no such asset.
    /// Last write wins: concurrent admin edits carry no version check.
    pub fn update_media_asset(&self, id: &str, patch: &MediaAssetPatch) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE media_assets SET \
                 title = COALESCE(?2, title), \
                 description = COALESCE(?3, description), \
                 category_id = COALESCE(?4, category_id), \
                 is_recommended = COALESCE(?5, is_recommended) \
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.title,
                    patch.description,
                    patch.category_id,
                    patch.is_recommended,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the asset row (and its saved_items references), returning
    /// the file_url it pointed at so the caller can drop the stored object.
    pub fn delete_media_asset(&self, id: &str) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let url: Option<String> = conn
                .query_row("SELECT file_url FROM media_assets WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;

            if url.is_some() {
                conn.execute("DELETE FROM saved_items WHERE media_asset_id = ?1", [id])?;
                conn.execute("DELETE FROM media_assets WHERE id = ?1", [id])?;
            }
            Ok(url)
        })
    }

    pub fn count_media_assets(&self, asset_type: Option<&str>) -> Result<i64> {
        self.with_conn(|conn| match asset_type {
            Some(kind) => Ok(conn.query_row(
                "SELECT COUNT(*) FROM media_assets WHERE asset_type = ?1",
                [kind],
                |row| row.get(0),
            )?),
            None => Ok(conn.query_row("SELECT COUNT(*) FROM media_assets", [], |row| row.get(0))?),
        })
    }

    /// Every object URL the row store still references; the orphan sweep
    /// keeps anything in this set.
    pub fn referenced_file_urls(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT file_url FROM media_assets \
                 UNION \
                 SELECT avatar_url FROM profiles WHERE avatar_url IS NOT NULL",
            )?;
            let urls = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(urls)
        })
    }

    // -- Saved items --

    /// Idempotent save: INSERT OR IGNORE against the (user, asset) unique
    /// constraint. Returns true when a row was inserted, false when the
    /// pair was already saved (racing duplicates are ignored, never errors).
    pub fn save_item(&self, id: &str, user_id: &str, media_asset_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO saved_items (id, user_id, media_asset_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, user_id, media_asset_id],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Returns true when a row was actually deleted; deleting an
    /// already-unsaved pair is a successful no-op.
    pub fn unsave_item(&self, user_id: &str, media_asset_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM saved_items WHERE user_id = ?1 AND media_asset_id = ?2",
                rusqlite::params![user_id, media_asset_id],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn is_saved(&self, user_id: &str, media_asset_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM saved_items WHERE user_id = ?1 AND media_asset_id = ?2",
                    rusqlite::params![user_id, media_asset_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn list_saved_assets(&self, user_id: &str) -> Result<Vec<SavedAssetRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT s.created_at, {ASSET_COLUMNS} \
                 FROM saved_items s \
                 JOIN media_assets m ON s.media_asset_id = m.id \
                 LEFT JOIN categories c ON m.category_id = c.id \
                 WHERE s.user_id = ?1 \
                 ORDER BY s.created_at DESC, s.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(SavedAssetRow {
                        saved_at: row.get(0)?,
                        asset: MediaAssetRow {
                            id: row.get(1)?,
                            title: row.get(2)?,
                            description: row.get(3)?,
                            file_url: row.get(4)?,
                            format: row.get(5)?,
                            asset_type: row.get(6)?,
                            category_id: row.get(7)?,
                            category_name: row.get(8)?,
                            uploader_id: row.get(9)?,
                            is_recommended: row.get(10)?,
                            created_at: row.get(11)?,
                        },
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_profile(conn: &Connection, column: &str, value: &str) -> Result<Option<ProfileRow>> {
    // column is a compile-time constant ("id" / "email"), never user input
    let sql = format!(
        "SELECT id, email, password, display_name, avatar_url, is_admin, created_at \
         FROM profiles WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(ProfileRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                display_name: row.get(3)?,
                avatar_url: row.get(4)?,
                is_admin: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_media(conn: &Connection, filter: &MediaFilter) -> Result<Vec<MediaAssetRow>> {
    let mut sql = format!(
        "SELECT {ASSET_COLUMNS} FROM media_assets m \
         LEFT JOIN categories c ON m.category_id = c.id"
    );

    let pattern = filter.search.as_ref().map(|q| format!("%{q}%"));
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<&dyn ToSql> = Vec::new();

    if let Some(kind) = &filter.asset_type {
        params.push(kind);
        clauses.push(format!("m.asset_type = ?{}", params.len()));
    }
    if let Some(category_id) = &filter.category_id {
        params.push(category_id);
        clauses.push(format!("m.category_id = ?{}", params.len()));
    }
    if let Some(pattern) = &pattern {
        params.push(pattern);
        clauses.push(format!("m.title LIKE ?{}", params.len()));
    }
    if filter.recommended_only {
        clauses.push("m.is_recommended = 1".into());
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    params.push(&filter.limit);
    sql.push_str(&format!(
        " ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?{}",
        params.len()
    ));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params.as_slice(), asset_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn asset_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaAssetRow> {
    Ok(MediaAssetRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        file_url: row.get(3)?,
        format: row.get(4)?,
        asset_type: row.get(5)?,
        category_id: row.get(6)?,
        category_name: row.get(7)?,
        uploader_id: row.get(8)?,
        is_recommended: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
