use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a media asset, derived at upload time from the file's declared
/// MIME type: `video/*` maps to `Video`, everything else to `Image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Video,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Image => "image",
            AssetType::Video => "video",
        }
    }

    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            AssetType::Video
        } else {
            AssetType::Image
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(AssetType::Image),
            "video" => Ok(AssetType::Video),
            other => Err(format!("unknown asset type: {other}")),
        }
    }
}

/// Application-level user record, distinct from the session principal.
/// `is_admin` is the sole authorization signal for privileged routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub format: String,
    pub asset_type: AssetType,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub uploader_id: Option<Uuid>,
    pub is_recommended: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub created_at: String,
}

/// A saved item as presented to the owning user: the asset itself plus
/// when it was saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAsset {
    pub saved_at: String,
    #[serde(flatten)]
    pub asset: MediaAsset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_type_follows_declared_mime() {
        assert_eq!(AssetType::from_mime("video/mp4"), AssetType::Video);
        assert_eq!(AssetType::from_mime("video/webm"), AssetType::Video);
        assert_eq!(AssetType::from_mime("image/png"), AssetType::Image);
        assert_eq!(AssetType::from_mime("application/octet-stream"), AssetType::Image);
    }

    #[test]
    fn asset_type_parses_its_own_display() {
        for kind in [AssetType::Image, AssetType::Video] {
            assert_eq!(kind.as_str().parse::<AssetType>().unwrap(), kind);
        }
        assert!("audio".parse::<AssetType>().is_err());
    }
}
