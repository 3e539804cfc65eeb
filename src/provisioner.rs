// src/provisioner.rs

use crate::config::Config;
use crate::discovery::DiscoveryClient;
use crate::document::{
    OAuthKeyConfiguration, OAuthSettingsDocument, UserDocument, OAUTH_SETTINGS_MEDIA_TYPE, USER_MEDIA_TYPE,
};
use crate::error::Result;
use crate::model::VcdSession;
use crate::org::OrgClient;
use crate::session::{accept_json, accept_xml, SessionClient};
use tracing::{debug, info, instrument};

/// Runs the two provisioning workflows against one identity provider and one vCloud organization.
///
/// Every workflow is a straight sequence of requests. The first failure is
/// returned as-is and nothing after it is sent; nothing is retried or rolled back.
#[derive(Clone)]
pub struct Provisioner {
    config: Config,
    http_client: reqwest::Client,
    discovery: DiscoveryClient,
    sessions: SessionClient,
    org: OrgClient,
}

impl Provisioner {
    /// Creates a new `Provisioner` with its own HTTP client.
    pub fn new(config: Config) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Creates a new `Provisioner` sharing an existing HTTP client.
    pub fn with_http_client(config: Config, http_client: reqwest::Client) -> Self {
        Self {
            discovery: DiscoveryClient::new(http_client.clone(), &config),
            sessions: SessionClient::new(http_client.clone(), &config),
            org: OrgClient::new(http_client.clone(), &config),
            http_client,
            config,
        }
    }

    /// Negotiates the newest supported API version and logs in with it.
    pub async fn open_session(&self) -> Result<VcdSession> {
        let version = self.sessions.negotiate_api_version().await?;
        self.sessions.open_session(&version).await
    }

    /// Registers the identity provider as the organization's OAuth provider, using a fresh session.
    pub async fn integrate_org(&self) -> Result<()> {
        let session = self.open_session().await?;
        self.integrate_org_with(&session).await
    }

    /// Registers the identity provider as the organization's OAuth provider.
    ///
    /// Fetches the discovery document and signing keys, converts every key to
    /// PEM and replaces the organization's OAuth settings wholesale.
    #[instrument(skip(self, session), fields(org_id = %session.org_id), err)]
    pub async fn integrate_org_with(&self, session: &VcdSession) -> Result<()> {
        let oidc = self.discovery.fetch_openid_config().await?;
        let signing_keys = self.discovery.fetch_signing_keys().await?;
        let keys = signing_keys
            .iter()
            .map(OAuthKeyConfiguration::try_from)
            .collect::<Result<Vec<_>>>()?;

        let document = OAuthSettingsDocument::new(
            &oidc,
            keys,
            &self.config.client_id,
            &self.config.client_secret,
        );
        let body = document.to_xml()?;

        let url = format!("{}/admin/org/{}/settings/oauth", self.config.vcd_api(), session.org_id);
        debug!("Updating OAuth settings at: {}", url);
        self.http_client
            .put(&url)
            .bearer_auth(&session.token)
            .header(reqwest::header::ACCEPT, accept_xml(&session.version))
            .header(reqwest::header::CONTENT_TYPE, OAUTH_SETTINGS_MEDIA_TYPE)
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        info!(issuer = %oidc.issuer, keys = document.keys.len(), "Organization OAuth settings updated");
        Ok(())
    }

    /// Creates an external user with the Organization Administrator role, using a fresh session.
    pub async fn import_user(&self, username: &str) -> Result<()> {
        let session = self.open_session().await?;
        self.import_user_with(&session, username).await
    }

    /// Creates an external (OAuth) user named `username` with the Organization Administrator role.
    #[instrument(skip(self, session), fields(org_id = %session.org_id), err)]
    pub async fn import_user_with(&self, session: &VcdSession, username: &str) -> Result<()> {
        let role_href = self.org.find_admin_role_href(session).await?;
        let body = UserDocument::new(username, role_href).to_xml()?;

        let url = format!("{}/admin/org/{}/users", self.config.vcd_api(), session.org_id);
        debug!("Creating user at: {}", url);
        self.http_client
            .post(&url)
            .bearer_auth(&session.token)
            .header(reqwest::header::ACCEPT, accept_json(&session.version))
            .header(reqwest::header::CONTENT_TYPE, USER_MEDIA_TYPE)
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        info!(%username, "User imported");
        Ok(())
    }
}
