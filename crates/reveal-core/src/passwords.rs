use anyhow::anyhow;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand_core::OsRng;

/// Hash with Argon2id and a fresh random salt.
pub fn hash(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// A malformed stored hash is an error; a wrong password is `Ok(false)`.
pub fn verify(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| anyhow!("corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let h = hash("segredo123").unwrap();
        assert!(h.starts_with("$argon2id$"));
        assert!(verify("segredo123", &h).unwrap());
        assert!(!verify("outra", &h).unwrap());
    }

    #[test]
    fn corrupt_hash_is_an_error() {
        assert!(verify("x", "not-a-phc-string").is_err());
    }
}
