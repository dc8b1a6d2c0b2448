use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MediaAsset;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

// -- Saved items --

/// The caller sends the state it currently believes; the response carries
/// the store-reconciled state after the write.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveToggleRequest {
    pub saved: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveToggleResponse {
    pub saved: bool,
}

// -- Media --

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub latest: Vec<MediaAsset>,
    pub recommended: Vec<MediaAsset>,
}

#[derive(Debug, Serialize)]
pub struct AssetDetailResponse {
    #[serde(flatten)]
    pub asset: MediaAsset,
    /// Present only for authenticated callers.
    pub saved: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAssetRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub is_recommended: Option<bool>,
}

// -- Admin --

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub image_count: i64,
    pub video_count: i64,
    pub user_count: i64,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}
