//! Cryptographic helpers for one-time codes and opaque tokens.
//!
//! Every secret handed to a member (join codes, claim codes, reset codes,
//! reset links) is stored only as a SHA-256 hex digest. Human-typed codes are
//! normalized before hashing so that casing and dashes never matter.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Alphabet for human-typed codes. Excludes 0/O and 1/I.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Shape of a generated one-time code: total characters and group width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFormat {
    pub length: usize,
    pub group: usize,
}

/// Registration join codes: `XXXXX-XXXXX`.
pub const JOIN_CODE: CodeFormat = CodeFormat {
    length: 10,
    group: 5,
};

/// Account claim codes: `XXXXX-XXXXX`.
pub const CLAIM_CODE: CodeFormat = CodeFormat {
    length: 10,
    group: 5,
};

/// Admin-issued password reset codes: `XXXX-XXXX-XXXX`.
pub const RESET_CODE: CodeFormat = CodeFormat {
    length: 12,
    group: 4,
};

/// A freshly generated code together with the hash that gets persisted.
#[derive(Debug, Clone)]
pub struct OneTimeCode {
    /// Plaintext, shown to the caller exactly once.
    pub code: String,
    /// `sha256_hex(normalize_code(code))`.
    pub code_hash: String,
}

impl CodeFormat {
    /// Draws `length` random bytes and maps each onto [`CODE_ALPHABET`].
    pub fn generate(&self) -> OneTimeCode {
        let code = generate_code(self.length, self.group);
        let code_hash = hash_code(&code);
        OneTimeCode { code, code_hash }
    }
}

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Uppercases and strips everything that is not `A-Z` or `0-9`.
pub fn normalize_code(value: &str) -> String {
    value
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Hash of a human-typed code after normalization.
pub fn hash_code(value: &str) -> String {
    sha256_hex(&normalize_code(value))
}

/// Generates a grouped code such as `ABCDE-FGHJK`.
pub fn generate_code(length: usize, group: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);

    let raw: Vec<char> = bytes
        .iter()
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect();

    if group == 0 {
        return raw.into_iter().collect();
    }

    raw.chunks(group)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// Opaque random token, base64url without padding.
pub fn random_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Length check followed by a comparison that always touches every byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_normalize_code_strips_punctuation_and_case() {
        assert_eq!(normalize_code(" abcde-fghjk "), "ABCDEFGHJK");
        assert_eq!(normalize_code("ab cd_ef.gh"), "ABCDEFGH");
        assert_eq!(normalize_code(""), "");
    }

    #[test]
    fn test_hash_code_ignores_formatting() {
        let code = JOIN_CODE.generate();
        let retyped = code.code.to_lowercase().replace('-', " ");
        assert_eq!(hash_code(&retyped), code.code_hash);
    }

    #[test]
    fn test_join_code_shape() {
        let code = JOIN_CODE.generate().code;
        assert_eq!(code.len(), 11);
        assert_eq!(code.as_bytes()[5], b'-');
        assert!(code
            .chars()
            .filter(|c| *c != '-')
            .all(|c| CODE_ALPHABET.contains(&(c as u8))));
    }

    #[test]
    fn test_reset_code_shape() {
        let code = RESET_CODE.generate().code;
        let groups: Vec<&str> = code.split('-').collect();
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() == 4));
    }

    #[test]
    fn test_alphabet_excludes_confusables() {
        for c in [b'0', b'O', b'1', b'I'] {
            assert!(!CODE_ALPHABET.contains(&c));
        }
    }

    #[test]
    fn test_generate_code_without_groups() {
        assert_eq!(generate_code(8, 0).len(), 8);
    }

    #[test]
    fn test_random_token_is_url_safe() {
        let token = random_token(32);
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, random_token(32));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
