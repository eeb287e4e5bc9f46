//! bcrypt password hashing
//!
//! Hashing is CPU bound, so both operations run on the blocking pool.

use crate::error::{ApiError, ApiResult};

pub async fn hash_password(password: &str, cost: u32) -> ApiResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::InternalError(format!("Hashing task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::InternalError(format!("Hashing task failed: {}", e)))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("Secret@123", 4).await.unwrap();
        assert_ne!(hash, "Secret@123");
        assert!(verify_password("Secret@123", &hash).await.unwrap());
        assert!(!verify_password("secret@123", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_against_malformed_hash_errors() {
        assert!(verify_password("anything", "not-a-bcrypt-hash").await.is_err());
    }
}
