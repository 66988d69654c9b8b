// SPDX-License-Identifier: MIT

//! Argon2id password hashing and verification.

use crate::error::AppError;
use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

// Fallback hash so that login attempts for unknown emails spend the same
// time verifying as attempts against real accounts.
const DUMMY_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

fn hasher() -> Argon2<'static> {
    Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(15000, 2, 1, None).expect("valid argon2 params"),
    )
}

/// Hash a password for storage, off the async runtime.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        let hash = hasher()
            .hash_password(password.as_bytes(), &salt)
            .context("Failed to hash password")?;
        Ok::<_, anyhow::Error>(hash.to_string())
    })
    .await
    .context("Password hashing task failed")?
    .map_err(AppError::Internal)
}

/// Verify a password candidate against a stored PHC hash.
///
/// Pass `None` for unknown accounts; the dummy hash is verified instead so
/// the caller can reject without leaking which emails exist.
pub async fn verify_password(
    stored_hash: Option<String>,
    candidate: String,
) -> Result<bool, AppError> {
    let account_exists = stored_hash.is_some();
    let expected = stored_hash.unwrap_or_else(|| DUMMY_HASH.to_string());

    let verified = tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&expected)
            .context("Failed to parse hash in PHC string format")?;
        Ok::<_, anyhow::Error>(
            Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task failed")?
    .map_err(AppError::Internal)?;

    Ok(account_exists && verified)
}
