//! The four controller operations: assertion consumer, logout, single
//! logout, and SP metadata.

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{error, info};
use url::Url;

use super::error::AuthError;
use super::state::AuthState;
use super::strategy::LogoutRequest;
use super::token::{generate_session_token, generate_wallet_token};
use super::types::{to_app_user, AppUser, SessionToken};
use super::validation::validate_spid_user;

const SESSION_COOKIE_NAME: &str = "spid_session";

/// The assertion consumer service: validate the IDP payload, issue the
/// token pair, persist the session, and redirect the client.
#[utoipa::path(
    post,
    path = "/acs",
    responses(
        (status = 308, description = "Session created; redirect carries the session token"),
        (status = 500, description = "Validation or persistence failure")
    ),
    tag = "auth"
)]
pub async fn acs(Extension(state): Extension<Arc<AuthState>>, Json(payload): Json<Value>) -> Response {
    match consume_assertion(&state, &payload).await {
        Ok(url) => Redirect::permanent(url.as_str()).into_response(),
        Err(err) => {
            error!(kind = err.kind(), "acs failed: {err}");
            err.into_response_with(state.config().tagged_errors())
        }
    }
}

/// Delete the current session and retrieve the logout URL from the IDP that
/// authenticated the user.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 308, description = "Redirect to the IDP logout URL"),
        (status = 500, description = "No session, persistence failure, or IDP error")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, Extension(state): Extension<Arc<AuthState>>) -> Response {
    match terminate_session(&state, &headers).await {
        Ok(url) => Redirect::permanent(url.as_str()).into_response(),
        Err(err) => {
            error!(kind = err.kind(), "logout failed: {err}");
            err.into_response_with(state.config().tagged_errors())
        }
    }
}

/// The single logout service. Stateless, always redirects to the
/// application root.
#[utoipa::path(
    get,
    path = "/slo",
    responses((status = 308, description = "Redirect to /")),
    tag = "auth"
)]
pub async fn slo() -> Redirect {
    Redirect::permanent("/")
}

/// The SAML metadata document for this Service Provider.
#[utoipa::path(
    get,
    path = "/metadata",
    responses(
        (status = 200, description = "SP metadata", content_type = "application/xml"),
        (status = 500, description = "Malformed certificate")
    ),
    tag = "auth"
)]
pub async fn metadata(Extension(state): Extension<Arc<AuthState>>) -> Response {
    match state
        .strategy()
        .generate_service_provider_metadata(state.config().saml_cert())
    {
        Ok(xml) => ([(CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(err) => {
            error!("metadata generation failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

/// Core of `acs`. Validation failure and persistence failure are both
/// terminal; nothing is written to the store unless the payload validated.
pub(crate) async fn consume_assertion(state: &AuthState, payload: &Value) -> Result<Url, AuthError> {
    let spid_user = validate_spid_user(payload)?;

    let session_token =
        generate_session_token().map_err(|err| AuthError::SessionStore(err.to_string()))?;
    let wallet_token =
        generate_wallet_token().map_err(|err| AuthError::SessionStore(err.to_string()))?;
    let user = to_app_user(spid_user, session_token, wallet_token);

    match state.storage().set(&user).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(AuthError::SessionStore(
                "Error creating the user session".to_string(),
            ))
        }
        Err(err) => return Err(AuthError::SessionStore(err.to_string())),
    }

    info!(spid_idp = %user.spid_idp, spid_level = %user.spid_level, "user session created");
    Ok(state.client_redirect_url(&user.session_token))
}

/// Core of `logout`: resolve the caller's session, delete it, then target
/// the IDP recorded at login for the protocol-level logout.
pub(crate) async fn terminate_session(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<Url, AuthError> {
    let user = extract_user_from_request(state, headers).await?;

    match state
        .storage()
        .del(&user.session_token, &user.wallet_token)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return Err(AuthError::SessionStore(
                "Error deleting the user session".to_string(),
            ))
        }
        Err(err) => return Err(AuthError::SessionStore(err.to_string())),
    }

    info!(spid_idp = %user.spid_idp, "user session deleted");
    spid_logout(state, &user.spid_idp).await
}

/// Resolve the current user from the request's session token. Provided here
/// on behalf of the session middleware; absence of a resolvable session is
/// an extraction failure, not a store failure.
async fn extract_user_from_request(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<AppUser, AuthError> {
    let token = extract_session_token(headers)
        .ok_or_else(|| AuthError::Extraction("user not authenticated".to_string()))?;
    match state.storage().get(&SessionToken::new(token)).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AuthError::Extraction("user not authenticated".to_string())),
        Err(err) => Err(AuthError::SessionStore(err.to_string())),
    }
}

/// Bridge the strategy's callback-based logout into a single-resolution
/// future. The oneshot sender is consumed on first use, so the callback can
/// never resolve twice; the timeout bounds a callback that never fires.
async fn spid_logout(state: &AuthState, entity_id: &str) -> Result<Url, AuthError> {
    let (tx, rx) = oneshot::channel();
    state.strategy().logout(
        &LogoutRequest {
            entity_id: entity_id.to_string(),
        },
        Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }),
    );

    let outcome = match timeout(state.config().idp_logout_timeout(), rx).await {
        Ok(Ok(outcome)) => outcome,
        // Callback dropped without firing, or never fired at all.
        Ok(Err(_)) | Err(_) => {
            return Err(AuthError::ExternalProvider(
                "identity provider unreachable".to_string(),
            ))
        }
    };

    let url = outcome.map_err(|err| AuthError::ExternalProvider(err.to_string()))?;
    Url::parse(&url).map_err(|err| {
        AuthError::ExternalProvider(format!("invalid logout URL from identity provider: {err}"))
    })
}

/// Session token from a bearer header or the session cookie.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        if let Some((key, val)) = pair.trim().split_once('=') {
            if key.trim() == SESSION_COOKIE_NAME {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("spid_session=def"));
        assert_eq!(extract_session_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn cookie_token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; spid_session=tok123; lang=it"),
        );
        assert_eq!(extract_session_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_session_token(&headers), None);
    }
}
