use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    authorization::require_ownership,
    jwt::{IssuedToken, TokenIssuer},
    password::CredentialHasher,
};
use crate::error::{DomainError, DomainResult};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::notify::Notifier;
use crate::repository::UserRepository;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

const BAD_CREDENTIALS: &str = "Invalid email or password";

/// Registration input
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Account registration, login and profile management
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenIssuer>,
    notifier: Arc<dyn Notifier>,
}

/// Trims and lower-cases an email address, rejecting obviously malformed ones
pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(DomainError::invalid_input("email address is malformed")),
    }
}

fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::invalid_input("name must not be empty"));
    }
    Ok(name.to_string())
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenIssuer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repo,
            hasher,
            tokens,
            notifier,
        }
    }

    /// Creates an account
    ///
    /// The email pre-check only short-circuits the common case; the store's
    /// unique index decides races, and both paths surface as `Conflict`.
    /// The registration notification runs detached and cannot fail this call.
    #[instrument(
        name = "taskboard.users.register",
        skip(self, input),
        fields(email = %input.email)
    )]
    pub async fn register(&self, input: NewUser) -> DomainResult<User> {
        let name = normalize_name(&input.name)?;
        let email = normalize_email(&input.email)?;

        let password_len = input.password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
            return Err(DomainError::invalid_input(format!(
                "password must be between {} and {} characters",
                MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            )));
        }

        if self.repo.email_exists(&email).await? {
            return Err(DomainError::Conflict(format!(
                "email {} is already registered",
                email
            )));
        }

        let password_hash = self.hash_password(input.password).await?;

        let user = self
            .repo
            .create_user(CreateUser {
                uuid: Uuid::new_v4(),
                name,
                email,
                password_hash,
            })
            .await?;

        let notifier = Arc::clone(&self.notifier);
        let summary = user.summary();
        tokio::spawn(async move {
            if let Err(e) = notifier.user_registered(&summary).await {
                warn!(user_id = %summary.id, error = %e, "Registration notification failed");
            }
        });

        info!(user_id = %user.uuid, "User registered");
        Ok(user)
    }

    /// Checks credentials and issues a bearer token
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(name = "taskboard.users.authenticate", skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> DomainResult<(User, IssuedToken)> {
        let email = normalize_email(email)
            .map_err(|_| DomainError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            debug!("Login for unknown email");
            return Err(DomainError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        if !self.verify_password(password.to_string(), user.password_hash.clone()).await? {
            debug!(user_id = %user.uuid, "Login with wrong password");
            return Err(DomainError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let token = self.tokens.issue(user.uuid)?;
        info!(user_id = %user.uuid, "User authenticated");
        Ok((user, token))
    }

    #[instrument(name = "taskboard.users.get", skip(self))]
    pub async fn get_user(&self, id: Uuid) -> DomainResult<User> {
        self.repo
            .find_user(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("user {} not found", id)))
    }

    pub async fn list_users(&self) -> DomainResult<Vec<User>> {
        Ok(self.repo.list_users().await?)
    }

    /// Updates the requestor's own name and/or email
    #[instrument(name = "taskboard.users.update", skip(self, patch))]
    pub async fn update_user(
        &self,
        id: Uuid,
        patch: UpdateUser,
        requestor: Uuid,
    ) -> DomainResult<User> {
        require_ownership(requestor, id)?;

        if patch.is_empty() {
            return Err(DomainError::invalid_input("nothing to update"));
        }

        let name = patch.name.as_deref().map(normalize_name).transpose()?;
        let email = patch.email.as_deref().map(normalize_email).transpose()?;

        let current = self.get_user(id).await?;

        // Keeping one's own address is not a conflict.
        let email = email.filter(|e| *e != current.email);
        if let Some(email) = &email {
            if self.repo.email_exists(email).await? {
                return Err(DomainError::Conflict(format!(
                    "email {} is already registered",
                    email
                )));
            }
        }

        let user = self.repo.update_user(id, UpdateUser { name, email }).await?;
        info!(user_id = %id, "User profile updated");
        Ok(user)
    }

    pub async fn email_exists(&self, email: &str) -> DomainResult<bool> {
        let email = normalize_email(email)?;
        Ok(self.repo.email_exists(&email).await?)
    }

    /// Verifies a bearer token and returns the user id it was issued for
    pub fn verify_token(&self, token: &str) -> DomainResult<Uuid> {
        Ok(self.tokens.verify(token)?.sub)
    }

    async fn hash_password(&self, password: String) -> DomainResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::Internal(format!("hashing task failed: {}", e)))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> DomainResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| DomainError::Internal(format!("verification task failed: {}", e)))??;
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").expect("valid"),
            "alice@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("alice@").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Bob ").expect("valid"), "Bob");
        assert!(normalize_name("   ").is_err());
    }
}
