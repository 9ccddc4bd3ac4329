/// Request authentication context
///
/// The API's JWT layer takes the token from the `Authorization: Bearer`
/// header, falling back to the [`SESSION_COOKIE`] set at login, and inserts
/// an [`AuthContext`] into the request extensions. Handlers extract it with
/// Axum's `Extension` extractor and pass `auth.user_id` to the services as
/// the requestor.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::middleware::{extract_bearer, AuthError};
///
/// assert_eq!(extract_bearer(Some("Bearer abc.def")).unwrap(), "abc.def");
/// assert!(matches!(extract_bearer(None), Err(AuthError::MissingCredentials)));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::Claims;

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
        }
    }
}

/// Authentication failures raised before a handler runs
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header or session cookie")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

/// Cookie carrying the raw JWT for browser clients
pub const SESSION_COOKIE: &str = "Authorization";

/// Finds `name` in a `Cookie` request header value
pub fn cookie_value<'a>(header: Option<&'a str>, name: &str) -> Option<&'a str> {
    header?
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Token from the `Authorization` header, else from the session cookie
///
/// A present but malformed header is an error even when the cookie is set.
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    cookie: Option<&'a str>,
) -> Result<&'a str, AuthError> {
    if authorization.is_some() {
        return extract_bearer(authorization);
    }

    cookie_value(cookie, SESSION_COOKIE).ok_or(AuthError::MissingCredentials)
}

/// `Set-Cookie` value for a freshly issued token
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}; Expires={}",
        SESSION_COOKIE,
        token,
        max_age,
        expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc.def")).expect("token"), "abc.def");
    }

    #[test]
    fn test_extract_bearer_missing() {
        assert!(matches!(extract_bearer(None), Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn test_extract_bearer_wrong_scheme() {
        assert!(matches!(
            extract_bearer(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            extract_bearer(Some("Bearer   ")),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_cookie_value() {
        let header = Some("theme=dark; Authorization=abc.def ; other=1");
        assert_eq!(cookie_value(header, "Authorization"), Some("abc.def"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value(Some("Authorization="), "Authorization"), None);
        assert_eq!(cookie_value(None, "Authorization"), None);
    }

    #[test]
    fn test_extract_token_prefers_header() {
        let token = extract_token(Some("Bearer from.header"), Some("Authorization=from.cookie"))
            .expect("token");
        assert_eq!(token, "from.header");
    }

    #[test]
    fn test_extract_token_falls_back_to_cookie() {
        let token = extract_token(None, Some("Authorization=from.cookie")).expect("token");
        assert_eq!(token, "from.cookie");

        assert!(matches!(extract_token(None, None), Err(AuthError::MissingCredentials)));
        assert!(matches!(
            extract_token(None, Some("theme=dark")),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_extract_token_bad_header_ignores_cookie() {
        assert!(matches!(
            extract_token(Some("Basic dXNlcjpwYXNz"), Some("Authorization=from.cookie")),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let expires_at = Utc::now() + Duration::hours(1);
        let cookie = session_cookie("abc.def", expires_at, false);

        assert!(cookie.starts_with("Authorization=abc.def; "));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains(" GMT"));
        assert!(!cookie.contains("Secure"));

        let max_age: i64 = cookie
            .split("; ")
            .find_map(|attr| attr.strip_prefix("Max-Age="))
            .and_then(|v| v.parse().ok())
            .expect("max-age");
        assert!((3590..=3600).contains(&max_age));

        assert!(session_cookie("abc.def", expires_at, true).ends_with("; Secure"));
    }

    #[test]
    fn test_context_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Duration::hours(1));
        assert_eq!(AuthContext::from_claims(&claims).user_id, user_id);
    }
}
