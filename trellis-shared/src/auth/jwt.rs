/// Session token encoding and validation
///
/// Session tokens are HS256-signed JWTs that carry the user's ID and email.
/// They are stateless: nothing is stored server-side, and a token stays
/// valid until `exp` as long as its subject still exists.
///
/// # Claims
///
/// - `sub`: User ID
/// - `email`: User email at issue time
/// - `iss`: Issuer, checked on validation
/// - `iat` / `nbf` / `exp`: Unix timestamps
///
/// # Example
///
/// ```
/// use trellis_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, "ada@example.com", "trellis", Duration::minutes(60));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret, "trellis")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, issuer or timing check failed
    #[error("Invalid token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Not a decodable JWT at all
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// User email at issue time
    pub email: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims valid from now for `ttl`
    ///
    /// A negative `ttl` produces an already-expired token, which is handy
    /// in tests.
    pub fn new(user_id: Uuid, email: &str, issuer: &str, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.to_string(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims into a compact HS256 token
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Verifies the signature, the issuer, `exp` and `nbf`. No clock leeway is
/// granted, so a token is rejected the second it expires.
pub fn validate_token(token: &str, secret: &str, issuer: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => {
            JwtError::InvalidFormat(e.to_string())
        }
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    Ok(token_data.claims)
}
