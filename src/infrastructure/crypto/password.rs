//! Password hashing for renter and staff accounts
//!
//! bcrypt with the library default cost. Hashes embed their own salt and
//! cost factor, so verification needs nothing beyond the stored string.

use bcrypt::{hash, verify, DEFAULT_COST};

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hashed = hash_password("correct horse battery staple").unwrap();
        assert_ne!(hashed, "correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &hashed).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hashed = hash_password("original").unwrap();
        assert!(!verify_password("different", &hashed).unwrap());
    }
}
