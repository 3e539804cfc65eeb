// src/discovery.rs

use crate::config::Config;
use crate::error::{Result, VcdOidcError};
use crate::model::{OidcConfiguration, OidcDiscoveryDocument, SigningKey, SigningKeySet, REQUIRED_SCOPES};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Reads the identity provider's OIDC discovery document and signing keys.
#[derive(Clone)]
pub struct DiscoveryClient {
    http_client: reqwest::Client,
    identity_api: String,
}

impl DiscoveryClient {
    pub fn new(http_client: reqwest::Client, config: &Config) -> Self {
        Self {
            http_client,
            identity_api: config.identity_api(),
        }
    }

    /// Fetches the discovery document and narrows it to what the platform needs.
    ///
    /// The returned scopes are always the required `openid email profile` set,
    /// not the provider's full advertised list.
    ///
    /// # Errors
    ///
    /// `HttpError` on a failed or non-2xx request, `UnsupportedScopes` if the
    /// provider does not advertise every required scope.
    #[instrument(skip(self), err)]
    pub async fn fetch_openid_config(&self) -> Result<OidcConfiguration> {
        let url = format!("{}/.well-known/openid-configuration", self.identity_api);
        debug!("Performing OIDC discovery at: {}", url);

        let document: OidcDiscoveryDocument = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let supported: HashSet<&str> = document.scopes_supported.iter().map(String::as_str).collect();
        if !REQUIRED_SCOPES.iter().all(|scope| supported.contains(scope)) {
            return Err(VcdOidcError::UnsupportedScopes {
                required: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
                supported: document.scopes_supported,
            });
        }

        debug!(issuer = %document.issuer, "Discovery document accepted");
        Ok(OidcConfiguration {
            issuer: document.issuer,
            authorization_endpoint: document.authorization_endpoint,
            token_endpoint: document.token_endpoint,
            userinfo_endpoint: document.userinfo_endpoint,
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Fetches the provider's current signing keys.
    #[instrument(skip(self), err)]
    pub async fn fetch_signing_keys(&self) -> Result<Vec<SigningKey>> {
        let url = format!("{}/keys", self.identity_api);

        let key_set: SigningKeySet = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Fetched {} signing keys from {}", key_set.keys.len(), url);
        Ok(key_set.keys)
    }
}
