//! Session tokens, the validated SPID user, and the persisted session record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Opaque token identifying the general application session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token identifying the wallet-scoped sub-session.
///
/// Distinct draw from the session token; the two are never derived from each
/// other.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct WalletToken(String);

impl WalletToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SPID assurance level carried by the assertion.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpidLevel {
    L1,
    L2,
    L3,
}

impl SpidLevel {
    /// Accepts both the short form (`L2`) and the authn context class
    /// reference URI the IDP puts in the assertion.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let short = value
            .strip_prefix("https://www.spid.gov.it/Spid")
            .unwrap_or(value);
        match short {
            "L1" => Some(Self::L1),
            "L2" => Some(Self::L2),
            "L3" => Some(Self::L3),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
        }
    }
}

impl fmt::Display for SpidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated projection of the raw identity-provider payload.
///
/// Only ever constructed by the validator; if validation fails no partial
/// value exists.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpidUser {
    pub name: String,
    pub surname: String,
    pub fiscal_code: String,
    pub email: Option<String>,
    pub spid_level: SpidLevel,
    /// Entity id of the IDP that authenticated this user. Several providers
    /// may be configured; logout must target this one.
    pub spid_idp: String,
}

/// The persisted session record, owned by the session store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppUser {
    pub name: String,
    pub surname: String,
    pub fiscal_code: String,
    pub email: Option<String>,
    pub spid_level: SpidLevel,
    pub spid_idp: String,
    pub session_token: SessionToken,
    pub wallet_token: WalletToken,
    pub created_at: i64,
}

/// Assemble the session record from a validated user and a fresh token pair.
#[must_use]
pub fn to_app_user(user: SpidUser, session_token: SessionToken, wallet_token: WalletToken) -> AppUser {
    AppUser {
        name: user.name,
        surname: user.surname,
        fiscal_code: user.fiscal_code,
        email: user.email,
        spid_level: user.spid_level,
        spid_idp: user.spid_idp,
        session_token,
        wallet_token,
        created_at: now_unix_seconds(),
    }
}

/// Unix seconds for the session creation instant.
fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spid_level_parses_short_form() {
        assert_eq!(SpidLevel::parse("L1"), Some(SpidLevel::L1));
        assert_eq!(SpidLevel::parse("L2"), Some(SpidLevel::L2));
        assert_eq!(SpidLevel::parse("L3"), Some(SpidLevel::L3));
        assert_eq!(SpidLevel::parse("L4"), None);
    }

    #[test]
    fn spid_level_parses_authn_context_uri() {
        assert_eq!(
            SpidLevel::parse("https://www.spid.gov.it/SpidL2"),
            Some(SpidLevel::L2)
        );
        assert_eq!(SpidLevel::parse("https://www.spid.gov.it/SpidL9"), None);
    }

    #[test]
    fn spid_level_displays_its_short_form() {
        assert_eq!(SpidLevel::L1.to_string(), "L1");
        assert_eq!(SpidLevel::L2.as_str(), "L2");
        assert_eq!(SpidLevel::L3.to_string(), SpidLevel::L3.as_str());
    }

    #[test]
    fn tokens_serialize_as_plain_strings() {
        let token = SessionToken::new("abc123".to_string());
        let value = serde_json::to_value(&token).expect("serialize");
        assert_eq!(value, serde_json::json!("abc123"));
    }

    #[test]
    fn to_app_user_carries_tokens_and_idp() {
        let user = SpidUser {
            name: "Mario".to_string(),
            surname: "Rossi".to_string(),
            fiscal_code: "RSSMRA80A01H501U".to_string(),
            email: None,
            spid_level: SpidLevel::L2,
            spid_idp: "idp1.example".to_string(),
        };
        let app_user = to_app_user(
            user,
            SessionToken::new("s".to_string()),
            WalletToken::new("w".to_string()),
        );
        assert_eq!(app_user.spid_idp, "idp1.example");
        assert_eq!(app_user.session_token.as_str(), "s");
        assert_eq!(app_user.wallet_token.as_str(), "w");
        assert!(app_user.created_at > 0);
    }
}
