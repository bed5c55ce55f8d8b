//! Input shape rules shared by the auth handlers.

/// Usernames are 3-20 chars of `[A-Za-z0-9_-]`.
pub fn username(s: &str) -> Result<(), &'static str> {
    if s.len() < 3 || s.len() > 20 {
        return Err("username must be 3-20 characters");
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("username may only contain letters, digits, _ and -");
    }
    Ok(())
}

/// Display names are trimmed, 1-30 chars, no control characters.
pub fn display_name(s: &str) -> Result<String, &'static str> {
    let name: String = s.trim().chars().filter(|c| !c.is_control()).collect();
    if name.is_empty() || name.chars().count() > 30 {
        return Err("display name must be 1-30 characters");
    }
    Ok(name)
}

pub fn password(s: &str) -> Result<(), &'static str> {
    if s.len() < 8 {
        return Err("password must be at least 8 characters");
    }
    Ok(())
}

/// Security questions are trimmed, 5-200 chars.
pub fn question(s: &str) -> Result<String, &'static str> {
    let q = s.trim().to_string();
    if q.chars().count() < 5 || q.chars().count() > 200 {
        return Err("security question must be 5-200 characters");
    }
    Ok(q)
}

pub fn answer(s: &str) -> Result<(), &'static str> {
    if s.trim().is_empty() {
        return Err("security answer must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_shapes() {
        assert!(username("ab").is_err());
        assert!(username("abc").is_ok());
        assert!(username("user_name-1").is_ok());
        assert!(username("user name").is_err());
        assert!(username(&"x".repeat(21)).is_err());
    }

    #[test]
    fn display_name_strips_controls() {
        assert_eq!(display_name("  Petrol\u{7}Head  ").unwrap(), "PetrolHead");
        assert!(display_name("   ").is_err());
        assert!(display_name(&"x".repeat(31)).is_err());
    }

    #[test]
    fn question_bounds() {
        assert!(question("Why?").is_err());
        assert!(question("First car you owned?").is_ok());
    }
}
