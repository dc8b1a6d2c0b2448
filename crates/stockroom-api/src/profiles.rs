use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use stockroom_storage::generate_object_key;
use stockroom_types::api::{AvatarResponse, UpdateProfileRequest};
use stockroom_types::models::Profile;

use crate::AppState;
use crate::session::CurrentUser;
use crate::uploads::{UploadError, read_form};

/// Avatar keys live one directory level down from media objects.
const AVATAR_PREFIX: &str = "avatars";

fn profile_response(row: stockroom_db::models::ProfileRow) -> anyhow::Result<Profile> {
    Ok(Profile {
        id: row.id.parse()?,
        email: row.email,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        is_admin: row.is_admin,
        created_at: row.created_at,
    })
}

/// GET /profile — the caller's own profile.
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || db.get_profile_by_id(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Profile lookup failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let profile = profile_response(row).map_err(|e| {
        error!("Profile row conversion failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(profile))
}

/// PATCH /profile — display name only; empty names are rejected before
/// any write.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let display_name = req.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let db = state.db.clone();
    let id = claims.sub.to_string();
    let updated = {
        let name = display_name.clone();
        tokio::task::spawn_blocking(move || db.update_display_name(&id, &name))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .map_err(|e| {
                error!("Profile update failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
    };
    if !updated {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Json(serde_json::json!({ "display_name": display_name })))
}

/// POST /profile/avatar — the avatar variant of the two-phase upload:
/// store the object, resolve its URL, then point the profile at it.
/// Same step ordering, same orphan gap as the media upload.
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    multipart: Multipart,
) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    match run_avatar_upload(&state, claims.sub, form).await {
        Ok(avatar_url) => Json(AvatarResponse { avatar_url }).into_response(),
        Err(e) => e.into_response(),
    }
}

pub(crate) async fn run_avatar_upload(
    state: &AppState,
    user_id: Uuid,
    form: crate::uploads::UploadForm,
) -> Result<String, UploadError> {
    // Validating
    let file = form.file.ok_or(UploadError::MissingField("file"))?;
    if file.bytes.is_empty() {
        return Err(UploadError::MissingField("file"));
    }
    if file.bytes.len() > crate::MAX_FILE_SIZE {
        return Err(UploadError::TooLarge);
    }

    // StoringFile
    let key = generate_object_key(&file.filename, Some(AVATAR_PREFIX));
    state
        .storage
        .store(&key, &file.bytes)
        .await
        .map_err(UploadError::StoreFile)?;

    // ResolvingUrl
    let avatar_url = state.storage.public_url(&key).map_err(UploadError::ResolveUrl)?;

    // WritingRecord
    let db = state.db.clone();
    let id = user_id.to_string();
    let url = avatar_url.clone();
    let updated = tokio::task::spawn_blocking(move || db.update_avatar_url(&id, &url))
        .await
        .map_err(|e| UploadError::WriteRecord(anyhow::anyhow!("join error: {e}")))?
        .map_err(UploadError::WriteRecord)?;
    if !updated {
        return Err(UploadError::WriteRecord(anyhow::anyhow!(
            "no profile row for {user_id}"
        )));
    }

    Ok(avatar_url)
}
