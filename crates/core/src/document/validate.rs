/// Input validation and normalization for documents, page paths, themes and
/// newsletter emails.
use thiserror::Error;

use super::model::{NewContent, ThemeSettings};

const MAX_TYPE_LEN: usize = 64;
const MAX_PATH_LEN: usize = 512;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document type is required")]
    MissingType,
    #[error("document type `{0}` must be lowercase letters, digits and dashes")]
    InvalidType(String),
    #[error("page path is required")]
    EmptyPath,
    #[error("page path `{0}` is invalid")]
    InvalidPath(String),
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error("theme name cannot be empty")]
    EmptyThemeName,
}

/// Check a content `type` discriminator.
pub fn validate_content_type(content_type: &str) -> Result<(), ValidationError> {
    if content_type.is_empty() {
        return Err(ValidationError::MissingType);
    }
    let well_formed = content_type.len() <= MAX_TYPE_LEN
        && content_type
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !content_type.starts_with('-')
        && !content_type.ends_with('-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidType(content_type.to_string()))
    }
}

pub fn validate_new_content(new: &NewContent) -> Result<(), ValidationError> {
    validate_content_type(&new.content_type)
}

pub fn validate_theme(settings: &ThemeSettings) -> Result<(), ValidationError> {
    if settings.name.trim().is_empty() {
        return Err(ValidationError::EmptyThemeName);
    }
    Ok(())
}

/// Normalize a tracked page path: drop query and fragment, force a leading
/// slash, and strip trailing slashes except on the root.
pub fn normalize_page_path(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let path = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    if path.len() > MAX_PATH_LEN || path.contains("://") || path.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidPath(trimmed.to_string()));
    }

    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    Ok(normalized)
}

/// Lowercase and sanity-check a newsletter email.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let invalid = || ValidationError::InvalidEmail(raw.trim().to_string());

    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types() {
        assert!(validate_content_type("home-page").is_ok());
        assert!(validate_content_type("faq2").is_ok());
        assert_eq!(validate_content_type(""), Err(ValidationError::MissingType));
        assert!(validate_content_type("Home Page").is_err());
        assert!(validate_content_type("-home").is_err());
        assert!(validate_content_type(&"a".repeat(65)).is_err());
    }

    #[test]
    fn page_paths() {
        assert_eq!(normalize_page_path("/").unwrap(), "/");
        assert_eq!(normalize_page_path("/blog/").unwrap(), "/blog");
        assert_eq!(normalize_page_path("services?ref=x#top").unwrap(), "/services");
        assert_eq!(normalize_page_path(""), Err(ValidationError::EmptyPath));
        assert_eq!(normalize_page_path("?utm=1"), Err(ValidationError::EmptyPath));
        assert!(normalize_page_path("https://evil.example/").is_err());
    }

    #[test]
    fn emails() {
        assert_eq!(normalize_email(" Jane@Example.COM ").unwrap(), "jane@example.com");
        assert!(normalize_email("jane@example").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("jane@@example.com").is_err());
        assert!(normalize_email("ja ne@example.com").is_err());
        assert!(normalize_email("jane@example..com").is_err());
    }

    #[test]
    fn theme_needs_a_name() {
        let mut settings = ThemeSettings::default();
        assert!(validate_theme(&settings).is_ok());
        settings.name = "  ".into();
        assert_eq!(validate_theme(&settings), Err(ValidationError::EmptyThemeName));
    }
}
