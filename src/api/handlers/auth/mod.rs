//! SPID authentication session controller.
//!
//! Turns an IDP-supplied identity assertion into an application session and
//! reverses that on logout, coordinating with the identity provider's own
//! logout protocol. The session store and the identity-provider strategy are
//! injected collaborators behind trait seams; the controller never touches
//! their internals.
//!
//! Every failure is terminal for the current request. By default the four
//! failure kinds are flattened into a uniform 500 carrying only the error
//! message, the contract legacy clients expect; `--tagged-errors` switches
//! to per-kind status codes.

pub(crate) mod error;
pub(crate) mod session;
mod state;
mod storage;
mod strategy;
mod token;
mod types;
mod validation;

pub use error::AuthError;
pub use state::{AuthConfig, AuthState, RedirectUrlBuilder};
pub use storage::{MemorySessionStorage, RedisSessionStorage, SessionStorage};
pub use strategy::{LogoutCallback, LogoutRequest, SamlSpidStrategy, SpidStrategy};
pub use types::{to_app_user, AppUser, SessionToken, SpidLevel, SpidUser, WalletToken};
