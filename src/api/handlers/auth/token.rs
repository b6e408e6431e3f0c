//! Session token generation.

use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};

use super::types::{SessionToken, WalletToken};

/// Random bytes per token; hex-encoded this yields 64 characters.
const TOKEN_BYTES: usize = 32;

/// Draw a fresh opaque token from the system CSPRNG.
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(hex::encode(bytes))
}

/// New token for the application session.
pub fn generate_session_token() -> Result<SessionToken> {
    Ok(SessionToken::new(generate_token()?))
}

/// New token for the wallet sub-session. Independent draw, not derived from
/// the session token.
pub fn generate_wallet_token() -> Result<WalletToken> {
    Ok(WalletToken::new(generate_token()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_fixed_length_hex() {
        let token = generate_session_token().expect("token");
        assert_eq!(token.as_str().len(), 64);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn session_and_wallet_tokens_are_distinct_draws() {
        let session = generate_session_token().expect("session token");
        let wallet = generate_wallet_token().expect("wallet token");
        assert_ne!(session.as_str(), wallet.as_str());
    }

    #[test]
    fn consecutive_tokens_do_not_repeat() {
        let first = generate_session_token().expect("first");
        let second = generate_session_token().expect("second");
        assert_ne!(first, second);
    }
}
