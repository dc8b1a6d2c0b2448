use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use stockroom_db::models::{MediaAssetPatch, MediaAssetRow, MediaFilter};
use stockroom_types::api::{AssetDetailResponse, DashboardResponse, HomeResponse, UpdateAssetRequest};
use stockroom_types::models::{AssetType, Category, MediaAsset};

use crate::AppState;
use crate::admin::require_admin;
use crate::session::{CurrentUser, MaybeUser};

const HOME_LATEST_LIMIT: u32 = 12;
const HOME_RECOMMENDED_LIMIT: u32 = 8;

/// Row-to-DTO conversion; ids in the store are always our own uuids, so a
/// parse failure is data corruption and surfaces as an error.
pub(crate) fn asset_response(row: MediaAssetRow) -> anyhow::Result<MediaAsset> {
    Ok(MediaAsset {
        id: row.id.parse()?,
        title: row.title,
        description: row.description,
        file_url: row.file_url,
        format: row.format,
        asset_type: row
            .asset_type
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?,
        category_id: row.category_id,
        category_name: row.category_name,
        uploader_id: match row.uploader_id {
            Some(id) => Some(id.parse()?),
            None => None,
        },
        is_recommended: row.is_recommended,
        created_at: row.created_at,
    })
}

fn asset_responses(rows: Vec<MediaAssetRow>) -> Result<Vec<MediaAsset>, StatusCode> {
    rows.into_iter()
        .map(asset_response)
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(|e| {
            error!("Asset row conversion failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// GET / — the gated landing data: latest additions plus the recommended
/// shelf. Anonymous callers never reach this (the gate redirects them).
pub async fn home(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let (latest, recommended) = tokio::task::spawn_blocking(move || {
        let latest = db.list_media_assets(&MediaFilter {
            limit: HOME_LATEST_LIMIT,
            ..Default::default()
        })?;
        let recommended = db.list_media_assets(&MediaFilter {
            recommended_only: true,
            limit: HOME_RECOMMENDED_LIMIT,
            ..Default::default()
        })?;
        anyhow::Ok((latest, recommended))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Home listing failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(HomeResponse {
        latest: asset_responses(latest)?,
        recommended: asset_responses(recommended)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category_id: Option<i64>,
    pub q: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    60
}

/// GET /media — browse with type / category / title-substring filters.
pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Reject unknown asset types rather than returning a confusing empty list
    if let Some(kind) = &query.kind {
        kind.parse::<AssetType>().map_err(|_| StatusCode::BAD_REQUEST)?;
    }

    let filter = MediaFilter {
        asset_type: query.kind,
        category_id: query.category_id,
        search: query.q.filter(|q| !q.trim().is_empty()),
        recommended_only: false,
        limit: query.limit.min(200),
    };

    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_media_assets(&filter))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Media listing failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(asset_responses(rows)?))
}

/// GET /media/{id} — asset detail; authenticated callers also learn
/// whether they saved it (their single source of truth at mount).
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeUser(claims): MaybeUser,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let asset_id = id.to_string();
    let user_id = claims.map(|c| c.sub.to_string());

    let (row, saved) = tokio::task::spawn_blocking(move || {
        let row = db.get_media_asset(&asset_id)?;
        let saved = match (&row, &user_id) {
            (Some(_), Some(user_id)) => Some(db.is_saved(user_id, &asset_id)?),
            _ => None,
        };
        anyhow::Ok((row, saved))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Asset lookup failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let row = row.ok_or(StatusCode::NOT_FOUND)?;
    let asset = asset_response(row).map_err(|e| {
        error!("Asset row conversion failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(AssetDetailResponse { asset, saved }))
}

/// GET /categories — pickers for the upload and edit forms.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    if let Some(kind) = &query.kind {
        kind.parse::<AssetType>().map_err(|_| StatusCode::BAD_REQUEST)?;
    }

    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_categories(query.kind.as_deref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Category listing failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let categories = rows
        .into_iter()
        .map(|row| {
            Ok(Category {
                id: row.id,
                name: row.name,
                kind: row.kind.parse().map_err(|e: String| anyhow::anyhow!(e))?,
                created_at: row.created_at,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(|e| {
            error!("Category row conversion failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(categories))
}

/// GET /admin — dashboard counters.
pub async fn admin_dashboard(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let db = state.db.clone();
    let counts = tokio::task::spawn_blocking(move || {
        anyhow::Ok(DashboardResponse {
            image_count: db.count_media_assets(Some("image"))?,
            video_count: db.count_media_assets(Some("video"))?,
            user_count: db.count_profiles()?,
        })
    })
    .await;

    match counts {
        Ok(Ok(counts)) => Json(counts).into_response(),
        Ok(Err(e)) => {
            error!("Dashboard counts failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!("spawn_blocking join error: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// PATCH /admin/assets/{id} — partial edit; last write wins.
pub async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
    Json(req): Json<UpdateAssetRequest>,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return StatusCode::UNPROCESSABLE_ENTITY.into_response();
        }
    }

    let patch = MediaAssetPatch {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        category_id: req.category_id,
        is_recommended: req.is_recommended,
    };

    let db = state.db.clone();
    let asset_id = id.to_string();
    let updated = tokio::task::spawn_blocking(move || {
        let found = db.update_media_asset(&asset_id, &patch)?;
        if !found {
            return anyhow::Ok(None);
        }
        Ok(db.get_media_asset(&asset_id)?)
    })
    .await;

    match updated {
        Ok(Ok(Some(row))) => match asset_response(row) {
            Ok(asset) => Json(asset).into_response(),
            Err(e) => {
                error!("Asset row conversion failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(Ok(None)) => StatusCode::NOT_FOUND.into_response(),
        Ok(Err(e)) => {
            error!("Asset update failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!("spawn_blocking join error: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// DELETE /admin/assets/{id} — removes the row, then best-effort removes
/// the stored object. An object-delete failure is logged, not surfaced;
/// the orphan sweep reconciles it later.
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    jar: CookieJar,
) -> Response {
    if let Err(redirect) = require_admin(&state, &jar) {
        return redirect.into_response();
    }

    let db = state.db.clone();
    let asset_id = id.to_string();
    let url = match tokio::task::spawn_blocking(move || db.delete_media_asset(&asset_id)).await {
        Ok(Ok(url)) => url,
        Ok(Err(e)) => {
            error!("Asset delete failed: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            error!("spawn_blocking join error: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Some(url) = url else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(key) = state.storage.key_for_url(&url) {
        if let Err(e) = state.storage.delete(&key).await {
            warn!("Stored object {key} not deleted (sweep will reconcile): {e}");
        }
    }

    StatusCode::NO_CONTENT.into_response()
}
