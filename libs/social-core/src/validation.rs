use validator::ValidationError;

pub const MAX_MESSAGE_LEN: usize = 4000;
pub const MAX_BIO_LEN: usize = 500;
pub const MAX_CITY_LEN: usize = 100;
pub const MAX_INTERESTS: usize = 20;

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.len() < 3 || trimmed.len() > 32 {
        return Err(ValidationError::new("username_length"));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::new("username_chars"));
    }

    Ok(())
}

pub fn validate_interests(values: &[String]) -> Result<(), ValidationError> {
    if values.len() > MAX_INTERESTS {
        return Err(ValidationError::new("too_many_interests"));
    }
    if values.iter().any(|tag| tag.trim().is_empty() || tag.len() > 64) {
        return Err(ValidationError::new("interest_length"));
    }
    Ok(())
}

/// A message needs non-empty content or attached media, never neither.
pub fn validate_message_body(content: &str, has_media: bool) -> Result<(), ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() && !has_media {
        return Err(ValidationError::new("message_empty"));
    }
    if trimmed.len() > MAX_MESSAGE_LEN {
        return Err(ValidationError::new("message_content_length"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_allows_alphanumeric_and_underscore_only() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("Bob99").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("bad-name").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn message_body_requires_content_or_media() {
        assert!(validate_message_body("hello", false).is_ok());
        assert!(validate_message_body("", true).is_ok());
        assert!(validate_message_body("   ", false).is_err());
        assert!(validate_message_body(&"x".repeat(MAX_MESSAGE_LEN + 1), false).is_err());
    }

    #[test]
    fn interest_tags_are_bounded() {
        assert!(validate_interests(&["hiking".to_string(), "jazz".to_string()]).is_ok());
        assert!(validate_interests(&vec!["tag".to_string(); MAX_INTERESTS + 1]).is_err());
        assert!(validate_interests(&["  ".to_string()]).is_err());
    }
}
