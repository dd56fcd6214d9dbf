use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Length of the public screening link token.
pub const SCREENING_TOKEN_LEN: usize = 40;

pub fn generate_access_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_screening_token() -> String {
    generate_access_token(SCREENING_TOKEN_LEN)
}

/// Cheap shape check before a token reaches the database.
pub fn looks_like_screening_token(raw: &str) -> bool {
    raw.len() == SCREENING_TOKEN_LEN && raw.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screening_tokens_are_alphanumeric_and_fixed_length() {
        let token = generate_screening_token();
        assert_eq!(token.len(), SCREENING_TOKEN_LEN);
        assert!(looks_like_screening_token(&token));
        assert_ne!(token, generate_screening_token());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(!looks_like_screening_token("short"));
        assert!(!looks_like_screening_token(&"a/".repeat(20)));
    }
}
