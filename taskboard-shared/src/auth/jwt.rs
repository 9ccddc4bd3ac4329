/// JWT bearer tokens
///
/// Tokens are HS256-signed, carry the user's external id as `sub`, and are
/// valid for seven days unless configured otherwise. Services depend on the
/// [`TokenIssuer`] trait; [`JwtIssuer`] is the production implementation.
///
/// # Claims
///
/// ```json
/// {
///   "sub": "<user uuid>",
///   "iss": "taskboard",
///   "iat": 1700000000,
///   "exp": 1700604800,
///   "nbf": 1700000000
/// }
/// ```
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{JwtIssuer, TokenIssuer};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = JwtIssuer::new("a-secret-that-is-at-least-32-bytes!!");
/// let user_id = Uuid::new_v4();
///
/// let token = issuer.issue(user_id)?;
/// let claims = issuer.verify(&token.token)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on every token
pub const ISSUER: &str = "taskboard";

/// Default token lifetime
pub const DEFAULT_TTL_HOURS: i64 = 24 * 7;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token format: {0}")]
    InvalidFormat(String),

    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,

    /// Always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly issued token and when it stops being accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens keyed by user id
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: Uuid) -> Result<IssuedToken, JwtError>;

    fn verify(&self, token: &str) -> Result<Claims, JwtError>;
}

/// HS256 implementation of [`TokenIssuer`]
#[derive(Clone)]
pub struct JwtIssuer {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl JwtIssuer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_ttl(secret, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, user_id: Uuid) -> Result<IssuedToken, JwtError> {
        let claims = Claims::new(user_id, self.ttl);
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| JwtError::CreateError("expiry out of range".to_string()))?;
        let token = create_token(&claims, &self.secret)?;
        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        validate_token(token, &self.secret)
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Checks signature, issuer, `exp` and `nbf`
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: ISSUER.to_string(),
            },
            jsonwebtoken::errors::ErrorKind::InvalidToken
            | jsonwebtoken::errors::ErrorKind::Base64(_)
            | jsonwebtoken::errors::ErrorKind::Json(_)
            | jsonwebtoken::errors::ErrorKind::Utf8(_) => {
                JwtError::InvalidFormat(format!("Malformed token: {}", e))
            }
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_default_ttl_is_seven_days() {
        let issuer = JwtIssuer::new(SECRET);
        assert_eq!(issuer.ttl(), Duration::days(7));
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Duration::hours(1));

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = JwtIssuer::new(SECRET);
        let user_id = Uuid::new_v4();

        let issued = issuer.issue(user_id).expect("Failed to issue token");
        let claims = issuer.verify(&issued.token).expect("Failed to verify token");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.expires_at(), Some(issued.expires_at));
    }

    #[test]
    fn test_verify_with_wrong_secret() {
        let issued = JwtIssuer::new(SECRET)
            .issue(Uuid::new_v4())
            .expect("Failed to issue token");

        let other = JwtIssuer::new("a-different-secret-also-32-bytes-long!");
        assert!(other.verify(&issued.token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims::new(Uuid::new_v4(), Duration::hours(-2));
        let token = create_token(&claims, SECRET).expect("Failed to create token");

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_issuer() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).expect("Failed to create token");

        assert!(matches!(
            validate_token(&token, SECRET),
            Err(JwtError::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn test_garbage_token() {
        assert!(validate_token("not.a.token", SECRET).is_err());
    }
}
