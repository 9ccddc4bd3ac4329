/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing behind [`password::CredentialHasher`]
/// - [`jwt`]: HS256 bearer tokens behind [`jwt::TokenIssuer`]
/// - [`middleware`]: the per-request [`middleware::AuthContext`] and bearer parsing
/// - [`authorization`]: who may do what to a task
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{JwtIssuer, TokenIssuer};
/// use taskboard_shared::auth::password::{Argon2Hasher, CredentialHasher, HashParams};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::with_params(HashParams::light());
/// let hash = hasher.hash("user_password")?;
/// assert!(hasher.verify("user_password", &hash)?);
///
/// let issuer = JwtIssuer::new("a-secret-that-is-at-least-32-bytes!!");
/// let token = issuer.issue(Uuid::new_v4())?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
