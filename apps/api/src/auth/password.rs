use anyhow::Context;
use tracing::warn;

use crate::errors::AppError;

/// bcrypt work factor for stored passwords.
pub const HASH_COST: u32 = 10;

/// Hashes a plaintext password. bcrypt is CPU-bound, so it runs on the blocking pool.
pub async fn hash_password(plain: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(plain, HASH_COST))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")?;
    Ok(hash)
}

/// Compares a plaintext password with a stored hash.
/// A stored value that is not a bcrypt hash never matches.
pub async fn verify_password(plain: String, hash: String) -> Result<bool, AppError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .context("password verification task failed")?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!("Stored password hash could not be parsed: {e}");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("123456".to_string()).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert_ne!(hash, "123456");
        assert!(verify_password("123456".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("1234567".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let a = hash_password("secret".to_string()).await.unwrap();
        let b = hash_password("secret".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_a_mismatch() {
        let matches = verify_password("123456".to_string(), "not-a-hash".to_string())
            .await
            .unwrap();
        assert!(!matches);
    }
}
