//! Identity-provider strategy seam and the default SAML implementation.
//!
//! Assertion parsing and signature verification belong to the strategy
//! collaborator, not to this crate; the controller only consumes the two
//! operations below.

use anyhow::{anyhow, Result};
use base64ct::{Base64, Encoding};
use std::collections::HashMap;

/// Parameters for an IDP-initiated logout, carrying the entity id of the
/// provider that authenticated the user.
#[derive(Clone, Debug)]
pub struct LogoutRequest {
    pub entity_id: String,
}

/// Completion callback for [`SpidStrategy::logout`]: invoked exactly once,
/// possibly off the calling stack, with the logout URL or an error.
pub type LogoutCallback = Box<dyn FnOnce(Result<String>) + Send + 'static>;

/// External identity-provider strategy.
pub trait SpidStrategy: Send + Sync {
    /// Render the Service Provider metadata document from the stored
    /// certificate.
    ///
    /// # Errors
    /// Returns an error when the certificate is malformed; a truncated
    /// document is never produced.
    fn generate_service_provider_metadata(&self, cert: &str) -> Result<String>;

    /// Initiate logout against the IDP named in the request. The strategy
    /// reports the outcome through `done`.
    fn logout(&self, request: &LogoutRequest, done: LogoutCallback);
}

/// Default SAML strategy: renders an `EntityDescriptor` for this SP and
/// resolves logout endpoints from a configured per-IDP registry.
pub struct SamlSpidStrategy {
    entity_id: String,
    acs_url: String,
    slo_url: String,
    idp_registry: HashMap<String, String>,
}

impl SamlSpidStrategy {
    #[must_use]
    pub fn new(
        entity_id: String,
        acs_url: String,
        slo_url: String,
        idp_registry: HashMap<String, String>,
    ) -> Self {
        Self {
            entity_id,
            acs_url,
            slo_url,
            idp_registry,
        }
    }
}

impl SpidStrategy for SamlSpidStrategy {
    fn generate_service_provider_metadata(&self, cert: &str) -> Result<String> {
        let cert_body = normalize_certificate(cert)?;

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{entity_id}">
  <md:SPSSODescriptor AuthnRequestsSigned="true" WantAssertionsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:KeyDescriptor use="signing">
      <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
        <ds:X509Data>
          <ds:X509Certificate>{cert_body}</ds:X509Certificate>
        </ds:X509Data>
      </ds:KeyInfo>
    </md:KeyDescriptor>
    <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="{slo_url}"/>
    <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:transient</md:NameIDFormat>
    <md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="{acs_url}" index="0" isDefault="true"/>
  </md:SPSSODescriptor>
</md:EntityDescriptor>
"#,
            entity_id = self.entity_id,
            cert_body = cert_body,
            slo_url = self.slo_url,
            acs_url = self.acs_url,
        ))
    }

    fn logout(&self, request: &LogoutRequest, done: LogoutCallback) {
        let outcome = self
            .idp_registry
            .get(&request.entity_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown identity provider: {}", request.entity_id));
        done(outcome);
    }
}

/// Strip PEM armor and whitespace, then check the body decodes as base64.
/// Rejecting here keeps a broken certificate from ending up inside an
/// otherwise well-formed metadata document.
fn normalize_certificate(cert: &str) -> Result<String> {
    let body: String = cert
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect::<Vec<_>>()
        .join("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if body.is_empty() {
        return Err(anyhow!("malformed certificate: empty body"));
    }

    Base64::decode_vec(&body).map_err(|_| anyhow!("malformed certificate: invalid base64"))?;

    Ok(body)
}
