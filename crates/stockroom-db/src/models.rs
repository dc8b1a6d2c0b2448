/// Database row types — these map directly to SQLite rows.
/// Distinct from the stockroom-types API models to keep the DB layer
/// independent.

pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub created_at: String,
}

pub struct MediaAssetRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub format: String,
    pub asset_type: String,
    pub category_id: Option<i64>,
    /// Joined from categories; None when the asset is uncategorized.
    pub category_name: Option<String>,
    pub uploader_id: Option<String>,
    pub is_recommended: bool,
    pub created_at: String,
}

pub struct SavedAssetRow {
    pub saved_at: String,
    pub asset: MediaAssetRow,
}

/// Filter for media listings. Empty filter lists everything newest-first.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    pub asset_type: Option<String>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub recommended_only: bool,
    pub limit: u32,
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self {
            asset_type: None,
            category_id: None,
            search: None,
            recommended_only: false,
            limit: 60,
        }
    }
}

/// Partial update for a media asset; None leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct MediaAssetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub is_recommended: Option<bool>,
}

pub struct NewMediaAsset<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub file_url: &'a str,
    pub format: &'a str,
    pub asset_type: &'a str,
    pub category_id: Option<i64>,
    pub uploader_id: Option<&'a str>,
    pub is_recommended: bool,
}
