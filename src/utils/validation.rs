use crate::error::{Result, ToolkitError};

/// Checks shared by settings loading and tool parameter validation.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Values copied from `.env.example` files rather than real secrets.
    pub fn looks_like_placeholder(secret: &str) -> bool {
        let lower = secret.trim().to_ascii_lowercase();
        lower.starts_with("your_")
            || lower.starts_with("your-")
            || lower.starts_with("<")
            || lower == "changeme"
            || lower == "xxx"
            || (lower.starts_with("sk-") && lower.len() < 20)
    }

    pub fn validate_secret(name: &str, secret: &str) -> Result<()> {
        if secret.trim().is_empty() {
            return Err(ToolkitError::Config(format!("{name} is empty")));
        }
        if Self::looks_like_placeholder(secret) {
            return Err(ToolkitError::Config(format!(
                "{name} looks like a placeholder; provide a real value"
            )));
        }
        Ok(())
    }

    /// Returns a description of the problem, if any.
    pub fn check_url(url: &str) -> Option<&'static str> {
        if url.trim().is_empty() {
            return Some("url must not be empty");
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Some("url must start with http:// or https://");
        }
        None
    }

    pub fn check_non_empty(value: &str) -> Option<&'static str> {
        value.trim().is_empty().then_some("must not be empty")
    }

    /// GitHub owner/repo style path segment.
    pub fn check_slug(value: &str) -> Option<&'static str> {
        if value.trim().is_empty() {
            return Some("must not be empty");
        }
        if !value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Some("may only contain letters, digits, `_`, `-` and `.`");
        }
        if value.chars().all(|c| c == '.') {
            return Some("must not be a `.` or `..` segment");
        }
        None
    }
}
