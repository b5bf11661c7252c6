use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};

use crate::appresult::{AppError, AppResult};

pub const MIN_LENGTH: usize = 8;

/// Argon2id hash in PHC string format.
pub fn hash(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Rejects passwords that are short, all digits, or just the username.
pub fn check_policy(password: &str, username: &str) -> AppResult<()> {
    if password.chars().count() < MIN_LENGTH {
        return Err(AppError::invalid(format!(
            "This password is too short. It must contain at least {MIN_LENGTH} characters."
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::invalid("This password is entirely numeric."));
    }
    if password.to_lowercase() == username.to_lowercase() {
        return Err(AppError::invalid("The password is too similar to the username."));
    }
    Ok(())
}
