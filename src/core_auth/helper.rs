use bcrypt::{hash, verify, BcryptResult, DEFAULT_COST};

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Produces a bcrypt hash suitable for the `password` field of a `[[users]]` entry.
pub fn hash_password(password: &str) -> BcryptResult<String> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    verify(password, hashed_password).unwrap_or(false)
}

pub fn is_bcrypt_hash(secret: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|prefix| secret.starts_with(prefix))
}
