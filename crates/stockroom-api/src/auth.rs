use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::error;
use uuid::Uuid;

use stockroom_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::AppState;
use crate::session::{CurrentUser, SESSION_COOKIE, session_cookie};

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    let email = req.email.trim().to_ascii_lowercase();
    if !email.contains('@') || email.len() < 5 || email.len() > 254 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let display_name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    // Check if the email is taken
    if state
        .db
        .get_profile_by_email(&email)
        .map_err(|e| {
            error!("Profile lookup failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .is_some()
    {
        return Err(StatusCode::CONFLICT);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .to_string();

    let user_id = Uuid::new_v4();

    state
        .db
        .create_profile(&user_id.to_string(), &email, &password_hash, display_name)
        .map_err(|e| {
            error!("Profile insert failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let token = state
        .sessions
        .issue(user_id, &email)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token)),
        Json(AuthResponse {
            user_id,
            email,
            display_name: display_name.map(str::to_string),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let email = req.email.trim().to_ascii_lowercase();

    // Unknown email and wrong password are indistinguishable to the caller
    let profile = state
        .db
        .get_profile_by_email(&email)
        .map_err(|e| {
            error!("Profile lookup failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let parsed_hash =
        PasswordHash::new(&profile.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user_id: Uuid = profile
        .id
        .parse()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = state
        .sessions
        .issue(user_id, &profile.email)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        jar.add(session_cookie(token)),
        Json(AuthResponse {
            user_id,
            email: profile.email,
            display_name: profile.display_name,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::from(SESSION_COOKIE)),
        StatusCode::NO_CONTENT,
    )
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<impl IntoResponse, StatusCode> {
    let profile = state
        .db
        .get_profile_by_id(&claims.sub.to_string())
        .map_err(|e| {
            error!("Profile lookup failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id: Uuid = profile
        .id
        .parse()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AuthResponse {
        user_id,
        email: profile.email,
        display_name: profile.display_name,
    }))
}

/// Minimal login shell: the redirect target for unauthenticated callers.
/// The real interface lives client-side; this keeps the path resolvable.
pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

const LOGIN_PAGE: &str = "<!doctype html>\n\
<html><head><title>Sign in — Stockroom</title></head>\n\
<body>\n\
<h1>Sign in</h1>\n\
<p>POST credentials to <code>/auth/login</code> or an account to <code>/auth/register</code>.</p>\n\
</body></html>\n";
