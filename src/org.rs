// src/org.rs

use crate::config::Config;
use crate::error::{Result, VcdOidcError};
use crate::model::{RoleQueryResult, VcdSession};
use crate::session::accept_json;
use tracing::{debug, instrument};

/// Name of the built-in role granted to imported users.
pub const ORG_ADMIN_ROLE: &str = "Organization Administrator";

/// Queries organization-scoped resources of the vCloud admin API.
#[derive(Clone)]
pub struct OrgClient {
    http_client: reqwest::Client,
    vcd_api: String,
}

impl OrgClient {
    pub fn new(http_client: reqwest::Client, config: &Config) -> Self {
        Self {
            http_client,
            vcd_api: config.vcd_api(),
        }
    }

    /// Resolves the `href` of the "Organization Administrator" role in the session's organization.
    pub async fn find_admin_role_href(&self, session: &VcdSession) -> Result<String> {
        self.find_role_href(session, ORG_ADMIN_ROLE).await
    }

    /// Resolves the `href` of the first role named exactly `role_name`.
    ///
    /// # Errors
    ///
    /// `HttpError` on a failed request, `RoleNotFound` if the query matches nothing.
    #[instrument(skip(self, session), fields(org_id = %session.org_id), err)]
    pub async fn find_role_href(&self, session: &VcdSession, role_name: &str) -> Result<String> {
        let url = format!("{}/admin/org/{}/roles/query", self.vcd_api, session.org_id);
        let filter = format!("name=={role_name}");

        let result: RoleQueryResult = self
            .http_client
            .get(&url)
            .bearer_auth(&session.token)
            .header(reqwest::header::ACCEPT, accept_json(&session.version))
            .query(&[("format", "records"), ("filter", filter.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let href = result
            .record
            .into_iter()
            .next()
            .map(|record| record.href)
            .ok_or_else(|| VcdOidcError::RoleNotFound(role_name.to_string()))?;

        debug!(%href, "Resolved role '{}'", role_name);
        Ok(href)
    }
}
