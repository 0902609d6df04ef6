//! bcrypt hashing off the async runtime. Accepts `$2y$` hashes written by other stacks.

use crate::error::AppError;

const HASH_COST: u32 = bcrypt::DEFAULT_COST;

pub async fn hash_password(plain: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, HASH_COST))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// False for a wrong password or a stored value that is not a bcrypt hash.
pub async fn verify_password(plain: String, hash: String) -> Result<bool, AppError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    match outcome {
        Ok(ok) => Ok(ok),
        Err(e) => {
            tracing::warn!(error = %e, "stored password is not a valid bcrypt hash");
            Ok(false)
        }
    }
}
