use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use bytes::Bytes;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use stockroom_db::models::NewMediaAsset;
use stockroom_storage::{file_extension, generate_object_key};
use stockroom_types::models::{AssetType, MediaAsset};

use crate::admin::require_admin;
use crate::media::asset_response;
use crate::{AppState, MAX_FILE_SIZE};

/// Failure of the upload flow, naming the step that failed. Steps run
/// strictly in sequence; nothing commits state before Validating passes,
/// and nothing is rolled back after it.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("file exceeds the upload size limit")]
    TooLarge,
    #[error("could not read upload form: {0}")]
    Form(String),
    #[error("storing the file failed")]
    StoreFile(#[source] anyhow::Error),
    #[error("resolving the public URL failed")]
    ResolveUrl(#[source] anyhow::Error),
    #[error("saving the media record failed")]
    WriteRecord(#[source] anyhow::Error),
}

impl UploadError {
    fn status(&self) -> StatusCode {
        match self {
            UploadError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Form(_) => StatusCode::BAD_REQUEST,
            UploadError::StoreFile(_) | UploadError::ResolveUrl(_) | UploadError::WriteRecord(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Upload flow failed: {self:?}");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub(crate) struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Default)]
pub(crate) struct UploadForm {
    pub file: Option<UploadedFile>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub is_recommended: bool,
}

/// POST /admin/assets — multipart form with `file`, `title`,
/// `category_id` and optional `description` / `is_recommended`.
pub async fn create_asset(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    // Defense in depth: the gate already covers /admin, but admin
    // handlers never rely on it alone.
    let claims = match require_admin(&state, &jar) {
        Ok(claims) => claims,
        Err(redirect) => return redirect.into_response(),
    };

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    match run_upload(&state, claims.sub, form).await {
        Ok(asset) => (StatusCode::CREATED, Json(asset)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub(crate) async fn read_form(mut multipart: Multipart) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Form(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::Form(e.to_string()))?;
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "title" => form.title = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "category_id" => {
                form.category_id = read_text(field).await?.trim().parse().ok();
            }
            "is_recommended" => {
                let value = read_text(field).await?;
                form.is_recommended = matches!(value.trim(), "true" | "on" | "1");
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, UploadError> {
    field.text().await.map_err(|e| UploadError::Form(e.to_string()))
}

/// The upload flow proper: Validating → StoringFile → ResolvingUrl →
/// WritingRecord → Done. No step is retried and earlier steps are never
/// compensated; an object stored before a later failure stays behind
/// for the orphan sweep.
pub(crate) async fn run_upload(
    state: &AppState,
    uploader: Uuid,
    form: UploadForm,
) -> Result<MediaAsset, UploadError> {
    // Validating: nothing has been written anywhere before this gate
    let file = form.file.ok_or(UploadError::MissingField("file"))?;
    if file.bytes.is_empty() {
        return Err(UploadError::MissingField("file"));
    }
    let title = form
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(UploadError::MissingField("title"))?;
    let category_id = form.category_id.ok_or(UploadError::MissingField("category"))?;
    if file.bytes.len() > MAX_FILE_SIZE {
        return Err(UploadError::TooLarge);
    }

    // StoringFile: not idempotent, a retry would write a fresh key
    let key = generate_object_key(&file.filename, None);
    state
        .storage
        .store(&key, &file.bytes)
        .await
        .map_err(UploadError::StoreFile)?;

    // ResolvingUrl
    let file_url = state.storage.public_url(&key).map_err(UploadError::ResolveUrl)?;

    // WritingRecord
    let asset_type = AssetType::from_mime(&file.content_type);
    let format = file_extension(&file.filename).unwrap_or("unknown").to_string();
    let id = Uuid::new_v4();

    let db = state.db.clone();
    let insert = {
        let id = id.to_string();
        let title = title.clone();
        let description = form.description.clone();
        let file_url = file_url.clone();
        let format = format.clone();
        let uploader = uploader.to_string();
        let is_recommended = form.is_recommended;
        move || {
            db.insert_media_asset(&NewMediaAsset {
                id: &id,
                title: &title,
                description: description.as_deref(),
                file_url: &file_url,
                format: &format,
                asset_type: asset_type.as_str(),
                category_id: Some(category_id),
                uploader_id: Some(&uploader),
                is_recommended,
            })
        }
    };
    tokio::task::spawn_blocking(insert)
        .await
        .map_err(|e| UploadError::WriteRecord(anyhow::anyhow!("join error: {e}")))?
        .map_err(UploadError::WriteRecord)?;

    // Done
    let db = state.db.clone();
    let fetch_id = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.get_media_asset(&fetch_id))
        .await
        .map_err(|e| UploadError::WriteRecord(anyhow::anyhow!("join error: {e}")))?
        .map_err(UploadError::WriteRecord)?
        .ok_or_else(|| UploadError::WriteRecord(anyhow::anyhow!("inserted row not found")))?;

    asset_response(row).map_err(UploadError::WriteRecord)
}
