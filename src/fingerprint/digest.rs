//! Canonical serialization and SHA-256 digest of a feature set.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Hex length of a SHA-256 digest.
pub const TOKEN_LEN: usize = 64;

/// Deterministic digest of a [`FeatureSet`](super::FeatureSet).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FingerprintToken(String);

impl FingerprintToken {
    /// Digest the canonical form of any serializable record.
    pub fn of<T: Serialize>(record: &T) -> Result<Self> {
        let canonical = canonical_json(record)?;
        Ok(FingerprintToken(sha256_hex(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FingerprintToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compact JSON with keys in declaration order.
pub fn canonical_json<T: Serialize>(record: &T) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Record {
        zeta: u32,
        alpha_beta: &'static str,
    }

    #[test]
    fn test_sha256_known_answer() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_canonical_json_keeps_declaration_order() {
        let json = canonical_json(&Record { zeta: 1, alpha_beta: "x" }).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alphaBeta":"x"}"#);
    }

    #[test]
    fn test_token_shape() {
        let token = FingerprintToken::of(&Record { zeta: 1, alpha_beta: "x" }).unwrap();
        assert_eq!(token.as_str().len(), TOKEN_LEN);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(token.as_str(), sha256_hex(br#"{"zeta":1,"alphaBeta":"x"}"#));
    }
}
