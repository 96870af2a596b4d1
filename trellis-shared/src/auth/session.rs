/// Credential and session authority
///
/// Owns registration, login and the mapping between session tokens and
/// identities. It is built once at startup from an immutable [`AuthConfig`]
/// and cloned into request handlers.
///
/// # Example
///
/// ```no_run
/// use trellis_shared::auth::session::{AuthConfig, SessionAuthority};
/// use chrono::Duration;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let authority = SessionAuthority::new(pool, AuthConfig {
///     secret: "a-secret-that-is-at-least-32-bytes-long".to_string(),
///     token_ttl: Duration::minutes(60),
///     issuer: "trellis".to_string(),
/// });
///
/// let user = authority.register("ada@example.com", "analytical1").await?;
/// let token = authority.issue_token(&user)?;
/// let same = authority.resolve_token(&token).await?;
/// assert_eq!(same.id, user.id);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{create_token, validate_token, Claims};
use super::password::{hash_password, verify_password};
use crate::error::{is_unique_violation, CoreError, CoreResult};
use crate::models::user::{normalize_email, CreateUser, UpdateProfile, User};

/// Immutable session settings read once at startup
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub secret: String,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,

    /// `iss` claim written and required on every token
    pub issuer: String,
}

/// Issues and resolves session tokens, verifies credentials
#[derive(Clone)]
pub struct SessionAuthority {
    pool: PgPool,
    config: Arc<AuthConfig>,
}

impl SessionAuthority {
    pub fn new(pool: PgPool, config: AuthConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Registers a new identity
    ///
    /// The password policy is checked at the HTTP boundary; this stores the
    /// Argon2id hash of whatever it is given.
    ///
    /// # Errors
    ///
    /// `DuplicateIdentity` if the normalized email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> CoreResult<User> {
        let email = normalize_email(email);

        if User::find_by_email(&self.pool, &email).await?.is_some() {
            return Err(CoreError::DuplicateIdentity);
        }

        let password_hash = hash_password(password)?;

        let user = User::create(&self.pool, CreateUser { email, password_hash })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CoreError::DuplicateIdentity
                } else {
                    CoreError::Database(e)
                }
            })?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(user)
    }

    /// Verifies an email/password pair
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> CoreResult<User> {
        let user = User::find_by_email(&self.pool, &normalize_email(email))
            .await?
            .ok_or(CoreError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(CoreError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Issues a session token for an identity
    pub fn issue_token(&self, user: &User) -> CoreResult<String> {
        let claims = Claims::new(
            user.id,
            &user.email,
            &self.config.issuer,
            self.config.token_ttl,
        );

        Ok(create_token(&claims, &self.config.secret)?)
    }

    /// Resolves a token to its identity
    ///
    /// Fails with `Unauthenticated` if the token is malformed, badly signed
    /// or expired, or if the user it names no longer exists. Read-only.
    pub async fn resolve_token(&self, token: &str) -> CoreResult<User> {
        let claims = validate_token(token, &self.config.secret, &self.config.issuer)?;

        User::find_by_id(&self.pool, claims.sub)
            .await?
            .ok_or_else(|| CoreError::Unauthenticated("User no longer exists".to_string()))
    }

    /// Returns the profile of an identity
    pub async fn profile(&self, user_id: Uuid) -> CoreResult<User> {
        User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(CoreError::NotFound("User"))
    }

    /// Merge-patches the profile fields of an identity
    ///
    /// An empty patch is rejected before the store is touched.
    pub async fn update_profile(&self, user_id: Uuid, patch: UpdateProfile) -> CoreResult<User> {
        if patch.is_empty() {
            return Err(CoreError::EmptyUpdate);
        }

        let user = User::update_profile(&self.pool, user_id, patch)
            .await?
            .ok_or(CoreError::NotFound("User"))?;

        tracing::info!(user_id = %user_id, "Profile updated");

        Ok(user)
    }
}
