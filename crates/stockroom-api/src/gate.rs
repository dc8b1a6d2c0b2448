use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::AppState;
use crate::admin::{AdminStatus, admin_status};
use crate::session::{Claims, session_cookie};

/// Paths the gate never touches, mirroring the served-object mount and
/// plain static files.
const STATIC_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, PartialEq, Eq)]
enum GateDecision {
    PassThrough,
    ToLogin,
    ToHome,
}

/// The request gate: resolves the session from the cookie and enforces
/// the route policy before any handler runs. Pure per-request decision:
/// no state is retained between requests; the cookie is the only
/// persisted artifact.
pub async fn request_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if is_static_path(&path) {
        return next.run(req).await;
    }

    let claims = state.sessions.from_jar(&jar);

    let mut response = match decide(&state, &path, claims.as_ref()) {
        GateDecision::PassThrough => {
            let mut req = req;
            if let Some(claims) = claims.clone() {
                req.extensions_mut().insert(claims);
            }
            next.run(req).await
        }
        GateDecision::ToLogin => Redirect::to("/login").into_response(),
        GateDecision::ToHome => Redirect::to("/").into_response(),
    };

    // Refresh the session cookie on every gated response, redirects
    // included, so continuity survives repeated requests.
    if let Some(claims) = claims {
        attach_refreshed_cookie(&state, &claims, &mut response);
    }

    response
}

/// Policy, evaluated in order: home and admin need a session; admin
/// additionally needs the role, checked fresh per request. An erroring
/// role lookup denies (fail closed), never fail open.
fn decide(state: &AppState, path: &str, claims: Option<&Claims>) -> GateDecision {
    match claims {
        None if path == "/" => GateDecision::ToLogin,
        None if path.starts_with("/admin") => GateDecision::ToLogin,
        None => GateDecision::PassThrough,
        Some(claims) if path.starts_with("/admin") => match admin_status(&state.db, claims.sub) {
            AdminStatus::Admin => GateDecision::PassThrough,
            AdminStatus::NotAdmin | AdminStatus::LookupFailed => GateDecision::ToHome,
        },
        Some(_) => GateDecision::PassThrough,
    }
}

fn attach_refreshed_cookie(state: &AppState, claims: &Claims, response: &mut Response) {
    let token = match state.sessions.refresh(claims) {
        Ok(token) => token,
        Err(e) => {
            warn!("Session refresh failed for {}: {e}", claims.sub);
            return;
        }
    };
    match HeaderValue::from_str(&session_cookie(token).to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!("Session cookie not header-safe: {e}"),
    }
}

fn is_static_path(path: &str) -> bool {
    path.strip_prefix(stockroom_storage::PUBLIC_MOUNT)
        .is_some_and(|rest| rest.starts_with('/'))
        || path == "/favicon.ico"
        || path
            .rsplit_once('.')
            .is_some_and(|(_, ext)| STATIC_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode, header};
    use tower::ServiceExt;
    use uuid::Uuid;

    use stockroom_db::Database;
    use stockroom_storage::Storage;

    use crate::session::{SESSION_COOKIE, SessionKeys};
    use crate::{AppState, router};

    async fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), Some("http://localhost:8350".into()))
            .await
            .unwrap();
        let state = AppState {
            db: Arc::new(Database::open_in_memory().unwrap()),
            storage: Arc::new(storage),
            sessions: Arc::new(SessionKeys::new("test-secret", 24)),
        };
        (dir, state)
    }

    fn seed_user(state: &AppState, email: &str, admin: bool) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .create_profile(&id.to_string(), email, "hash", None)
            .unwrap();
        if admin {
            state.db.set_admin(&id.to_string(), true).unwrap();
        }
        id
    }

    fn cookie_for(state: &AppState, user_id: Uuid, email: &str) -> String {
        let token = state.sessions.issue(user_id, email).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    async fn send(state: &AppState, path: &str, cookie: Option<&str>) -> axum::response::Response {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        router(state.clone())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn admin_without_session_goes_to_login() {
        let (_guard, state) = test_state().await;
        let response = send(&state, "/admin", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));
    }

    #[tokio::test]
    async fn admin_subpaths_are_gated_too() {
        let (_guard, state) = test_state().await;
        let response = send(&state, "/admin/assets", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));
    }

    #[tokio::test]
    async fn admin_with_non_admin_session_goes_home() {
        let (_guard, state) = test_state().await;
        let id = seed_user(&state, "user@example.com", false);
        let cookie = cookie_for(&state, id, "user@example.com");

        let response = send(&state, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/"));
    }

    #[tokio::test]
    async fn admin_with_admin_session_passes_and_refreshes_cookie() {
        let (_guard, state) = test_state().await;
        let id = seed_user(&state, "admin@example.com", true);
        let cookie = cookie_for(&state, id, "admin@example.com");

        let response = send(&state, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(set_cookie.starts_with(SESSION_COOKIE));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn home_without_session_goes_to_login() {
        let (_guard, state) = test_state().await;
        let response = send(&state, "/", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));
    }

    #[tokio::test]
    async fn home_with_session_passes() {
        let (_guard, state) = test_state().await;
        let id = seed_user(&state, "user@example.com", false);
        let cookie = cookie_for(&state, id, "user@example.com");

        let response = send(&state, "/", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn redirects_also_refresh_the_cookie() {
        let (_guard, state) = test_state().await;
        let id = seed_user(&state, "user@example.com", false);
        let cookie = cookie_for(&state, id, "user@example.com");

        let response = send(&state, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn revoked_admin_is_denied_on_the_next_request() {
        let (_guard, state) = test_state().await;
        let id = seed_user(&state, "admin@example.com", true);
        let cookie = cookie_for(&state, id, "admin@example.com");

        let first = send(&state, "/admin", Some(&cookie)).await;
        assert_eq!(first.status(), StatusCode::OK);

        // Revoke via direct store mutation, simulating an external change
        state.db.set_admin(&id.to_string(), false).unwrap();

        let second = send(&state, "/admin", Some(&cookie)).await;
        assert_eq!(second.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&second), Some("/"));
    }

    #[tokio::test]
    async fn garbage_cookie_is_treated_as_anonymous() {
        let (_guard, state) = test_state().await;
        let cookie = format!("{SESSION_COOKIE}=definitely-not-a-token");
        let response = send(&state, "/", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));
    }

    #[tokio::test]
    async fn login_page_is_reachable_anonymously() {
        let (_guard, state) = test_state().await;
        let response = send(&state, "/login", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn static_paths_skip_the_gate() {
        let (_guard, state) = test_state().await;
        // No session, but static paths are never redirected — they fall
        // through to the router (404 here, since the binary mounts them).
        for path in ["/favicon.ico", "/logo.png", "/assets/abc_1.png"] {
            let response = send(&state, path, None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
        }
    }

    #[test]
    fn static_path_matcher() {
        assert!(is_static_path("/assets/k_1.png"));
        assert!(is_static_path("/favicon.ico"));
        assert!(is_static_path("/hero.webp"));
        assert!(!is_static_path("/"));
        assert!(!is_static_path("/admin"));
        assert!(!is_static_path("/media"));
    }
}
