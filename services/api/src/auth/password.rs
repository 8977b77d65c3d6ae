//! services/api/src/auth/password.rs
//!
//! Argon2 password hashing and the password complexity policy.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::auth::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Checks `password` against a stored hash.
///
/// A hash that cannot be parsed (such as the guest account's placeholder)
/// never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored password hash is not usable: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Returns every rule `password` breaks; an empty list means it is acceptable.
pub fn policy_violations(password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "Passwords must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        problems.push("Passwords must have at least one non alphanumeric character.".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Passwords must have at least one digit ('0'-'9').".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        problems.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        problems.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("Abcdef1!").expect("hash should succeed");
        assert!(verify_password("Abcdef1!", &hash));
        assert!(!verify_password("Abcdef1?", &hash));
    }

    #[test]
    fn placeholder_hash_never_matches() {
        assert!(!verify_password("anything", "!"));
    }

    #[test]
    fn strong_password_passes_policy() {
        assert!(policy_violations("Abcdef1!").is_empty());
    }

    #[test]
    fn weak_password_lists_each_missing_rule() {
        let problems = policy_violations("abc");
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("uppercase")));
        assert!(problems.iter().any(|p| p.contains("digit")));
    }
}
