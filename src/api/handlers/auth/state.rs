//! Controller configuration and shared state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::storage::SessionStorage;
use super::strategy::SpidStrategy;
use super::types::SessionToken;

const DEFAULT_IDP_LOGOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the client redirection URL from a freshly issued session token.
/// Injected so deployments can swap the target without touching the
/// controller; must be deterministic in the token.
pub type RedirectUrlBuilder = Box<dyn Fn(&SessionToken) -> Url + Send + Sync>;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Public base URL of this Service Provider; ACS and SLO endpoints in
    /// the metadata document derive from it.
    public_base_url: String,
    /// SAML entity id of this SP. Defaults to the public base URL.
    entity_id: Option<String>,
    /// Client profile URL that receives the session token after `acs`.
    client_profile_url: Url,
    /// PEM-encoded SP certificate embedded in the metadata document.
    saml_cert: String,
    /// IDP entity id to single-logout endpoint.
    idp_registry: HashMap<String, String>,
    /// Upper bound on how long a logout request waits for the IDP callback.
    idp_logout_timeout: Duration,
    /// When false (the default) every failure is the legacy uniform 500;
    /// when true, responses carry per-kind status codes.
    tagged_errors: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(public_base_url: String, client_profile_url: Url, saml_cert: String) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            entity_id: None,
            client_profile_url,
            saml_cert,
            idp_registry: HashMap::new(),
            idp_logout_timeout: DEFAULT_IDP_LOGOUT_TIMEOUT,
            tagged_errors: false,
        }
    }

    #[must_use]
    pub fn with_entity_id(mut self, entity_id: String) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    #[must_use]
    pub fn with_idp_registry(mut self, registry: HashMap<String, String>) -> Self {
        self.idp_registry = registry;
        self
    }

    #[must_use]
    pub fn with_idp_logout_timeout(mut self, timeout: Duration) -> Self {
        self.idp_logout_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_tagged_errors(mut self, tagged: bool) -> Self {
        self.tagged_errors = tagged;
        self
    }

    #[must_use]
    pub fn entity_id(&self) -> &str {
        self.entity_id.as_deref().unwrap_or(&self.public_base_url)
    }

    #[must_use]
    pub fn acs_url(&self) -> String {
        format!("{}/acs", self.public_base_url)
    }

    #[must_use]
    pub fn slo_url(&self) -> String {
        format!("{}/slo", self.public_base_url)
    }

    #[must_use]
    pub fn saml_cert(&self) -> &str {
        &self.saml_cert
    }

    #[must_use]
    pub fn idp_registry(&self) -> &HashMap<String, String> {
        &self.idp_registry
    }

    #[must_use]
    pub const fn idp_logout_timeout(&self) -> Duration {
        self.idp_logout_timeout
    }

    #[must_use]
    pub const fn tagged_errors(&self) -> bool {
        self.tagged_errors
    }

    pub(super) fn client_profile_url(&self) -> &Url {
        &self.client_profile_url
    }
}

/// Shared state behind the four controller operations. All collaborators are
/// injected at construction; nothing here is global.
pub struct AuthState {
    config: AuthConfig,
    storage: Arc<dyn SessionStorage>,
    strategy: Arc<dyn SpidStrategy>,
    redirect_builder: RedirectUrlBuilder,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        storage: Arc<dyn SessionStorage>,
        strategy: Arc<dyn SpidStrategy>,
    ) -> Self {
        let profile_url = config.client_profile_url().clone();
        let redirect_builder: RedirectUrlBuilder = Box::new(move |token| {
            let mut url = profile_url.clone();
            url.query_pairs_mut().append_pair("token", token.as_str());
            url
        });
        Self {
            config,
            storage,
            strategy,
            redirect_builder,
        }
    }

    /// Replace the client redirection URL builder.
    #[must_use]
    pub fn with_redirect_builder(mut self, builder: RedirectUrlBuilder) -> Self {
        self.redirect_builder = builder;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn storage(&self) -> &dyn SessionStorage {
        self.storage.as_ref()
    }

    #[must_use]
    pub fn strategy(&self) -> &dyn SpidStrategy {
        self.strategy.as_ref()
    }

    pub(super) fn client_redirect_url(&self, token: &SessionToken) -> Url {
        (self.redirect_builder)(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::storage::MemorySessionStorage;
    use crate::api::handlers::auth::strategy::SamlSpidStrategy;

    fn config() -> AuthConfig {
        AuthConfig::new(
            "https://sp.example/".to_string(),
            Url::parse("https://app.example/profile").expect("url"),
            "cert".to_string(),
        )
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = config();
        assert_eq!(config.entity_id(), "https://sp.example");
        assert_eq!(config.acs_url(), "https://sp.example/acs");
        assert_eq!(config.slo_url(), "https://sp.example/slo");
        assert_eq!(config.idp_logout_timeout(), DEFAULT_IDP_LOGOUT_TIMEOUT);
        assert!(!config.tagged_errors());

        let config = config
            .with_entity_id("https://sp.example/metadata".to_string())
            .with_idp_logout_timeout(Duration::from_secs(3))
            .with_tagged_errors(true);
        assert_eq!(config.entity_id(), "https://sp.example/metadata");
        assert_eq!(config.idp_logout_timeout(), Duration::from_secs(3));
        assert!(config.tagged_errors());
    }

    #[test]
    fn default_redirect_builder_is_deterministic_in_the_token() {
        let config = config();
        let strategy = SamlSpidStrategy::new(
            config.entity_id().to_string(),
            config.acs_url(),
            config.slo_url(),
            HashMap::new(),
        );
        let state = AuthState::new(
            config,
            Arc::new(MemorySessionStorage::new()),
            Arc::new(strategy),
        );

        let token = SessionToken::new("a".repeat(64));
        let first = state.client_redirect_url(&token);
        let second = state.client_redirect_url(&token);
        assert_eq!(first, second);
        assert_eq!(
            first.as_str(),
            format!("https://app.example/profile?token={}", "a".repeat(64))
        );
    }
}
