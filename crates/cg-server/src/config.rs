use cg_core::ADMIN_KEY_MIN_LENGTH;

/// Boot-time configuration, environment-driven.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub admin_key: String,
    pub production: bool,
    pub origins: Vec<String>,
}

impl Config {
    /// Reads and validates the environment. Refuses to produce a
    /// config with a weak `ADMIN_KEY`: better to not start than to
    /// start guessable.
    pub fn from_env() -> anyhow::Result<Self> {
        let admin_key =
            std::env::var("ADMIN_KEY").map_err(|_| anyhow::anyhow!("ADMIN_KEY must be set"))?;
        vet(&admin_key).map_err(|why| anyhow::anyhow!("refusing weak ADMIN_KEY: {}", why))?;
        let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = std::env::var("PORT").unwrap_or_else(|_| "8080".into());
            format!("0.0.0.0:{}", port)
        });
        let production = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(Self {
            bind,
            admin_key,
            production,
            origins,
        })
    }
}

/// Fragments that disqualify a key outright.
const WEAK_FRAGMENTS: [&str; 9] = [
    "password",
    "admin",
    "secret",
    "letmein",
    "qwerty",
    "12345",
    "changeme",
    "default",
    "carguessr",
];

/// Admin key strength rules, checked once at boot:
/// length, no known-weak fragments, at least three character classes,
/// at least sixteen distinct characters, and no single character above
/// 30% of the length.
pub fn vet(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("key is empty");
    }
    if key.len() < ADMIN_KEY_MIN_LENGTH {
        return Err("key is shorter than 32 characters");
    }
    let lowered = key.to_lowercase();
    if WEAK_FRAGMENTS.iter().any(|frag| lowered.contains(frag)) {
        return Err("key contains a well-known weak fragment");
    }
    let classes = [
        key.chars().any(|c| c.is_ascii_lowercase()),
        key.chars().any(|c| c.is_ascii_uppercase()),
        key.chars().any(|c| c.is_ascii_digit()),
        key.chars().any(|c| !c.is_ascii_alphanumeric()),
    ]
    .iter()
    .filter(|&&present| present)
    .count();
    if classes < 3 {
        return Err("key needs at least three character classes");
    }
    let mut counts = std::collections::HashMap::new();
    for c in key.chars() {
        *counts.entry(c).or_insert(0usize) += 1;
    }
    if counts.len() < 16 {
        return Err("key needs at least sixteen distinct characters");
    }
    let most = counts.values().copied().max().unwrap_or(0);
    if most * 100 > key.chars().count() * 30 {
        return Err("one character dominates the key");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRONG: &str = "kV9#mQ2xTr8!bN4wZp6@eJ1cYf3&dHs5";

    #[test]
    fn strong_key_passes() {
        assert!(vet(STRONG).is_ok());
    }

    #[test]
    fn short_keys_fail() {
        assert!(vet("kV9#mQ2x").is_err());
        assert!(vet("").is_err());
    }

    #[test]
    fn weak_fragments_fail() {
        assert!(vet("Password123!Password123!Password123!").is_err());
        assert!(vet("xADMINx9#mQ2xTr8!bN4wZp6@eJ1cYf3&d").is_err());
    }

    #[test]
    fn class_poor_keys_fail() {
        assert!(vet("abcdefghijklmnopqrstuvwxyzabcdef").is_err());
        assert!(vet("abcdefghijklmnop0123456789098765").is_err());
    }

    #[test]
    fn repetitive_keys_fail() {
        // enough length, classes, and diversity, but 'a' dominates
        assert!(vet("aaaaaaaaaaaaaAB1!cdefghijklmnopq").is_err());
    }

    #[test]
    fn low_diversity_keys_fail() {
        assert!(vet("Ab1!Ab1!Ab1!Ab1!Ab1!Ab1!Ab1!Ab1!").is_err());
    }
}
