use argon2::Argon2;
use argon2::PasswordHash;
use argon2::PasswordHasher;
use argon2::PasswordVerifier;
use argon2::password_hash::SaltString;

fn salt() -> SaltString {
    use rand::Rng;
    let ref mut bytes = [0u8; 16];
    rand::rng().fill(bytes);
    SaltString::encode_b64(bytes).expect("salt")
}

pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt())
        .map(|h| h.to_string())
}

pub fn verify(password: &str, hashword: &str) -> bool {
    PasswordHash::new(hashword)
        .ok()
        .as_ref()
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), hash)
                .is_ok()
        })
        .unwrap_or(false)
}

/// True when a stored hash was minted under weaker parameters than the
/// current defaults; login re-hashes such passwords transparently.
pub fn stale(hashword: &str) -> bool {
    let current = argon2::Params::default();
    PasswordHash::new(hashword)
        .ok()
        .map(|hash| {
            hash.params.get_decimal("m") != Some(current.m_cost())
                || hash.params.get_decimal("t") != Some(current.t_cost())
                || hash.params.get_decimal("p") != Some(current.p_cost())
        })
        .unwrap_or(true)
}

/// Security answers are compared case- and whitespace-insensitively:
/// normalise before hashing and before verifying.
pub fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashword = hash("correct horse battery").unwrap();
        assert!(verify("correct horse battery", &hashword));
        assert!(!verify("wrong horse", &hashword));
    }

    #[test]
    fn fresh_hashes_are_not_stale() {
        let hashword = hash("some password").unwrap();
        assert!(!stale(&hashword));
    }

    #[test]
    fn garbage_hashes_are_stale() {
        assert!(stale("not-a-phc-string"));
    }

    #[test]
    fn normalized_answers_match() {
        assert_eq!(normalize("  Blue Escort  "), "blue escort");
        let hashword = hash(&normalize("Blue Escort")).unwrap();
        assert!(verify(&normalize("  blue escort"), &hashword));
    }
}
