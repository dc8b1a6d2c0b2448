use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use stockroom_db::Database;

use crate::AppState;
use crate::session::Claims;

/// Result of a role lookup. The deny branches are kept distinct so
/// fail-closed is an explicit, tested decision rather than a falsy
/// coercion; both collapse to "not allowed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    Admin,
    NotAdmin,
    LookupFailed,
}

impl AdminStatus {
    pub fn allowed(&self) -> bool {
        matches!(self, AdminStatus::Admin)
    }
}

/// Reads profiles.is_admin for the user, uncached, so a revoked admin
/// loses access on the very next request. A missing row counts as
/// NotAdmin; a query error as LookupFailed.
pub fn admin_status(db: &Database, user_id: Uuid) -> AdminStatus {
    match db.profile_is_admin(&user_id.to_string()) {
        Ok(Some(true)) => AdminStatus::Admin,
        Ok(Some(false)) | Ok(None) => AdminStatus::NotAdmin,
        Err(e) => {
            warn!("Admin lookup failed for {user_id}: {e}");
            AdminStatus::LookupFailed
        }
    }
}

pub fn is_admin(db: &Database, user_id: Uuid) -> bool {
    admin_status(db, user_id).allowed()
}

/// Where to send a caller that failed an authorization check:
/// unauthenticated callers go to the login page, authenticated but
/// unauthorized ones back home. Renders the same redirects as the
/// request gate so the two can never diverge.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRedirect {
    Login,
    Home,
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        match self {
            AuthRedirect::Login => Redirect::to("/login").into_response(),
            AuthRedirect::Home => Redirect::to("/").into_response(),
        }
    }
}

/// Admin gate used inside admin handlers, independently of the request
/// gate middleware (defense in depth). Resolves the session from the
/// cookie jar itself rather than trusting request extensions.
pub fn require_admin(state: &AppState, jar: &CookieJar) -> Result<Claims, AuthRedirect> {
    let claims = state.sessions.from_jar(jar).ok_or(AuthRedirect::Login)?;

    if admin_status(&state.db, claims.sub).allowed() {
        Ok(claims)
    } else {
        Err(AuthRedirect::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user(is_admin: bool) -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        db.create_profile(&id.to_string(), "u@example.com", "hash", None)
            .unwrap();
        if is_admin {
            db.set_admin(&id.to_string(), true).unwrap();
        }
        (db, id)
    }

    #[test]
    fn admin_flag_grants() {
        let (db, id) = db_with_user(true);
        assert_eq!(admin_status(&db, id), AdminStatus::Admin);
        assert!(is_admin(&db, id));
    }

    #[test]
    fn regular_user_denied() {
        let (db, id) = db_with_user(false);
        assert_eq!(admin_status(&db, id), AdminStatus::NotAdmin);
        assert!(!is_admin(&db, id));
    }

    #[test]
    fn missing_profile_denied() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(admin_status(&db, Uuid::new_v4()), AdminStatus::NotAdmin);
    }

    #[test]
    fn lookup_failure_fails_closed() {
        let (db, id) = db_with_user(true);
        // Break the schema out from under the query
        db.with_conn(|conn| {
            conn.execute("ALTER TABLE profiles RENAME TO profiles_gone", [])?;
            Ok(())
        })
        .unwrap();

        let status = admin_status(&db, id);
        assert_eq!(status, AdminStatus::LookupFailed);
        assert!(!status.allowed());
    }
}
