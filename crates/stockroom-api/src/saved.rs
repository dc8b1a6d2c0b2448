use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, error};
use uuid::Uuid;

use stockroom_types::api::{SaveToggleRequest, SaveToggleResponse};
use stockroom_types::models::SavedAsset;

use crate::AppState;
use crate::media::asset_response;
use crate::session::CurrentUser;

/// POST /media/{id}/save — flip the caller's saved state for one asset.
///
/// The request carries the state the caller believes; the response is the
/// store-reconciled state after the write. Rapid duplicate toggles from
/// the same believed state are absorbed: a racing second insert hits the
/// unique constraint and is ignored, a delete of an already-deleted row
/// is a no-op. Anonymous callers get 401 and no write happens.
pub async fn toggle_saved(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
    CurrentUser(claims): CurrentUser,
    Json(req): Json<SaveToggleRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let asset = asset_id.to_string();
    let user = claims.sub.to_string();

    let saved = tokio::task::spawn_blocking(move || {
        if db.get_media_asset(&asset)?.is_none() {
            return anyhow::Ok(None);
        }

        if req.saved {
            // Believed saved: remove. Removing nothing still lands on
            // "unsaved" — no stuck state.
            db.unsave_item(&user, &asset)?;
            Ok(Some(false))
        } else {
            let inserted = db.save_item(&Uuid::new_v4().to_string(), &user, &asset)?;
            if !inserted {
                debug!("Duplicate save for ({user}, {asset}) ignored");
            }
            Ok(Some(true))
        }
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Save toggle failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let saved = saved.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SaveToggleResponse { saved }))
}

/// GET /saved — the caller's saved assets, newest first.
pub async fn list_saved(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let user = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.list_saved_assets(&user))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Saved listing failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let saved = rows
        .into_iter()
        .map(|row| {
            Ok(SavedAsset {
                saved_at: row.saved_at,
                asset: asset_response(row.asset)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(|e| {
            error!("Saved row conversion failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(saved))
}
