//! Input shape checks shared by the controllers.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::error::{ApiError, ApiResult};

pub const MIN_NAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_TEXT_LEN: usize = 10_000;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::validation("Please provide a valid email"))
    }
}

pub fn validate_name(name: &str) -> ApiResult<()> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Name must be at least {MIN_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Trims `value`, failing with "`field` is required" when absent or blank.
pub fn require_text(field: &str, value: Option<&str>) -> ApiResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            if v.len() > MAX_TEXT_LEN {
                return Err(ApiError::validation(format!("{field} is too long")));
            }
            Ok(v.to_string())
        }
        _ => Err(ApiError::validation(format!("{field} is required"))),
    }
}

/// Trims an optional text, mapping blank to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_apply_by(value: &str) -> ApiResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::validation(format!("Invalid applyBy date '{value}'")))
}

/// Skills arrive either as a JSON array or as a comma separated string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    List(Vec<String>),
    Text(String),
}

impl SkillsInput {
    /// Trimmed, blank-free, de-duplicated (first occurrence wins).
    pub fn normalize(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            SkillsInput::List(items) => items.iter().map(String::as_str).collect(),
            SkillsInput::Text(text) => text.split(',').collect(),
        };

        let mut skills: Vec<String> = Vec::with_capacity(raw.len());
        for skill in raw.into_iter().map(str::trim).filter(|s| !s.is_empty()) {
            if !skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                skills.push(skill.to_string());
            }
        }
        skills
    }
}

impl From<Vec<String>> for SkillsInput {
    fn from(items: Vec<String>) -> Self {
        SkillsInput::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(validate_email("s@x.com").is_ok());
        assert!(validate_email("first.last+tag@uni.edu.au").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("a@b").is_err());
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn name_and_password_lengths() {
        assert!(validate_name("Al").is_err());
        assert!(validate_name("Ali").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("secret1").is_ok());
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(require_text("title", Some("  Dev ")).unwrap(), "Dev");
        assert!(require_text("title", Some("   ")).is_err());
        assert!(require_text("title", None).is_err());
        assert_eq!(optional_text(Some("  ")), None);
    }

    #[test]
    fn apply_by_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(parse_apply_by("2025-12-01").unwrap(), expected);
        assert_eq!(parse_apply_by("2025-12-01T10:00:00Z").unwrap(), expected);
        assert!(parse_apply_by("next tuesday").is_err());
        assert!(parse_apply_by("2025-13-01").is_err());
    }

    #[test]
    fn skills_from_either_shape() {
        let list = SkillsInput::List(vec![" Go ".into(), "".into(), "Rust".into(), "go".into()]);
        assert_eq!(list.normalize(), vec!["Go", "Rust"]);

        let text: SkillsInput = serde_json::from_str("\"SQL, , Docker,SQL\"").unwrap();
        assert_eq!(text.normalize(), vec!["SQL", "Docker"]);
    }
}
