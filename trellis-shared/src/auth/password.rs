/// Credential hashing with Argon2id
///
/// Hashes are stored as PHC strings, so the parameters travel with the hash
/// and verification needs no configuration.
///
/// # Parameters
///
/// - Memory: 19 MiB (19456 KiB)
/// - Iterations: 2
/// - Parallelism: 1
/// - Salt: 16 random bytes from the OS RNG
///
/// # Example
///
/// ```
/// use trellis_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse 1")?;
/// assert!(verify_password("correct horse 1", &hash)?);
/// assert!(!verify_password("battery staple 2", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Minimum accepted password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

const M_COST_KIB: u32 = 19_456;
const T_COST: u32 = 2;
const P_COST: u32 = 1;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a parseable PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(M_COST_KIB, T_COST, P_COST, None)
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash
/// itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks a candidate password against the registration policy
///
/// At least [`MIN_PASSWORD_LENGTH`] characters with at least one letter
/// and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.chars().any(char::is_alphabetic) {
        return Err("Password must contain at least one letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_argon2id_params() {
        let hash = hash_password("hunter22").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same_password1").unwrap();
        let b = hash_password("same_password1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password1").unwrap();

        assert!(verify_password("correct_password1", &hash).unwrap());
        assert!(!verify_password("wrong_password1", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("password1", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_strength("abcdefg1").is_ok());
        assert!(validate_password_strength("пароль123").is_ok());

        let err = validate_password_strength("abc1").unwrap_err();
        assert!(err.contains("at least 8 characters"));

        let err = validate_password_strength("12345678").unwrap_err();
        assert!(err.contains("letter"));

        let err = validate_password_strength("abcdefgh").unwrap_err();
        assert!(err.contains("digit"));
    }
}
