/// Password Hashing and Verification
///
/// bcrypt with a fixed cost. Strength and length rules live in
/// `validators::is_valid_password` and run before hashing.

use bcrypt::{hash, verify};

use crate::error::AppError;

/// bcrypt work factor for every stored password
pub const PASSWORD_HASH_COST: u32 = 10;

/// Hash a plaintext password
///
/// # Errors
/// Returns error if bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, PASSWORD_HASH_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}
