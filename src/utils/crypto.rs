use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(plain: &str, hashed: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hashed)?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Lowercase hex HMAC-SHA256 of `body`.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature; an optional `sha256=` prefix is accepted.
pub fn verify_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    let provided = provided.trim();
    let provided = provided.strip_prefix("sha256=").unwrap_or(provided).to_ascii_lowercase();
    let expected = sign_payload(secret, body);
    if expected.is_empty() || provided.len() != expected.len() {
        return false;
    }
    ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn signature_matches_known_vector() {
        let sig = sign_payload("key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(sig, "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8");
    }

    #[test]
    fn verifies_signatures() {
        let body = br#"{"from":"a@b.c"}"#;
        let sig = sign_payload("s3cret", body);
        assert!(verify_signature("s3cret", body, &sig));
        assert!(verify_signature("s3cret", body, &format!("sha256={}", sig.to_uppercase())));
        assert!(!verify_signature("other", body, &sig));
        assert!(!verify_signature("s3cret", b"tampered", &sig));
        assert!(!verify_signature("s3cret", body, "deadbeef"));
    }
}
