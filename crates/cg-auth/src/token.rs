use cg_core::TOKEN_TTL;
use std::time::SystemTime;

const TOKEN_BYTES: usize = 32;

/// Mints a fresh session token: 32 cryptographically random bytes,
/// hex-encoded. The raw token goes to the client; only [`digest`]
/// output is persisted.
pub fn mint() -> String {
    use rand::Rng;
    let ref mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 digest of a token, the only form stored at rest.
pub fn digest(token: &str) -> Vec<u8> {
    use sha2::Digest;
    sha2::Sha256::digest(token.as_bytes()).to_vec()
}

/// Expiry stamp for a token minted now.
pub fn expiry() -> SystemTime {
    SystemTime::now() + TOKEN_TTL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = mint();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(mint(), mint());
    }

    #[test]
    fn digest_is_stable() {
        let token = mint();
        assert_eq!(digest(&token), digest(&token));
        assert_eq!(digest(&token).len(), 32);
    }
}
