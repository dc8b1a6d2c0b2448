use axum::{extract::FromRequestParts, http::StatusCode, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "stockroom_session";

/// The authenticated principal carried by the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

/// Signing/verification keys for session tokens. Issued at login,
/// re-signed with a fresh expiry on every gated response.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            exp: (Utc::now() + chrono::Duration::hours(self.ttl_hours)).timestamp() as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn refresh(&self, claims: &Claims) -> anyhow::Result<String> {
        self.issue(claims.sub, &claims.email)
    }

    /// Any failure (malformed, forged, expired) is simply "no session".
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .ok()
    }

    /// The session carried by the request's cookie jar, if any.
    pub fn from_jar(&self, jar: &CookieJar) -> Option<Claims> {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| self.verify(cookie.value()))
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Authenticated-route extractor: the gate inserts `Claims` into request
/// extensions for valid sessions; missing claims answer 401.
pub struct CurrentUser(pub Claims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Like `CurrentUser` but infallible, for routes that adapt to both
/// anonymous and authenticated callers.
pub struct MaybeUser(pub Option<Claims>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Claims>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_verify_roundtrip() {
        let keys = SessionKeys::new("test-secret", 24);
        let user_id = Uuid::new_v4();

        let token = keys.issue(user_id, "a@b.test").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@b.test");
    }

    #[test]
    fn forged_and_garbage_tokens_are_no_session() {
        let keys = SessionKeys::new("test-secret", 24);
        let other = SessionKeys::new("different-secret", 24);

        let token = other.issue(Uuid::new_v4(), "a@b.test").unwrap();
        assert!(keys.verify(&token).is_none());
        assert!(keys.verify("not-a-token").is_none());
        assert!(keys.verify("").is_none());
    }

    #[test]
    fn expired_token_is_no_session() {
        let keys = SessionKeys::new("test-secret", -1);
        let token = keys.issue(Uuid::new_v4(), "a@b.test").unwrap();
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn refresh_extends_expiry() {
        let keys = SessionKeys::new("test-secret", 24);
        let token = keys.issue(Uuid::new_v4(), "a@b.test").unwrap();
        let claims = keys.verify(&token).unwrap();

        let refreshed = keys.refresh(&claims).unwrap();
        let new_claims = keys.verify(&refreshed).unwrap();
        assert_eq!(new_claims.sub, claims.sub);
        assert!(new_claims.exp >= claims.exp);
    }

    #[test]
    fn cookie_is_http_only_and_site_wide() {
        let cookie = session_cookie("tok".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
