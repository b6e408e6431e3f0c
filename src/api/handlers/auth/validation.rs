//! Narrowing of the raw identity-provider payload into a trusted `SpidUser`.
//!
//! The inbound shape is unconstrained at the boundary; nothing past this
//! module ever sees the unvalidated payload.

use regex::Regex;
use serde_json::Value;

use super::error::AuthError;
use super::types::{SpidLevel, SpidUser};

/// Validate the raw assertion payload and build the typed user, or reject it
/// with a message naming the first violated constraint. Pure, no I/O.
pub fn validate_spid_user(payload: &Value) -> Result<SpidUser, AuthError> {
    let attributes = payload
        .as_object()
        .ok_or_else(|| AuthError::Validation("payload is not an object".to_string()))?;

    let name = required_attribute(attributes, "name")?;
    let surname = required_attribute(attributes, "surname")?;

    let fiscal_code = required_attribute(attributes, "fiscalCode")?;
    if !valid_fiscal_code(&fiscal_code) {
        return Err(AuthError::Validation(format!(
            "malformed fiscal code: {fiscal_code}"
        )));
    }

    let level = required_attribute(attributes, "level")?;
    let spid_level = SpidLevel::parse(&level)
        .ok_or_else(|| AuthError::Validation(format!("unknown SPID level: {level}")))?;

    let spid_idp = required_attribute(attributes, "idp")?;

    let email = optional_attribute(attributes, "email");
    if let Some(email) = &email {
        if !valid_email(email) {
            return Err(AuthError::Validation(format!("malformed email: {email}")));
        }
    }

    Ok(SpidUser {
        name,
        surname,
        fiscal_code,
        email,
        spid_level,
        spid_idp,
    })
}

fn required_attribute(
    attributes: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, AuthError> {
    attributes
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AuthError::Validation(format!("missing or empty attribute: {key}")))
}

fn optional_attribute(attributes: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    attributes
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Italian fiscal code shape: 6 letters, 2 digits, letter, 2 digits, letter,
/// 3 digits, letter.
fn valid_fiscal_code(fiscal_code: &str) -> bool {
    Regex::new(r"^[A-Z]{6}[0-9]{2}[A-Z][0-9]{2}[A-Z][0-9]{3}[A-Z]$")
        .is_ok_and(|re| re.is_match(fiscal_code))
}

/// Basic email format check.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
