//! # spid-session (SPID Service Provider Session Controller)
//!
//! `spid-session` turns a SPID identity assertion into an application
//! session and reverses that on logout, coordinating with the identity
//! provider's single-logout protocol.
//!
//! ## Flow
//!
//! - **ACS** (`POST /acs`): the raw assertion payload is narrowed through a
//!   fail-closed validator, two independent opaque tokens are drawn (session
//!   and wallet), the session record is persisted, and the client is
//!   redirected with the session token.
//! - **Logout** (`/logout`): the session resolved from the request is
//!   deleted, then the IDP that authenticated the user (not necessarily the
//!   only one configured) is targeted for protocol-level logout.
//! - **SLO** (`GET /slo`): unconditional redirect to the application root.
//! - **Metadata** (`GET /metadata`): the SP's SAML metadata document.
//!
//! ## Collaborators
//!
//! The session store (Redis in production) and the identity-provider
//! strategy sit behind trait seams and are injected at construction. The
//! store exclusively owns the durable session record; the controller holds
//! only a transient reference during a request.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
