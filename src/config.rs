// src/config.rs

use crate::error::{Result, VcdOidcError};
use std::fmt;
use url::Url;

/// Environment variable holding the identity provider root URL.
pub const ENV_IAM_ROOT: &str = "IAM_ROOT";
/// Environment variable holding the vCloud Director root URL.
pub const ENV_VCD_ROOT: &str = "VCD_ROOT";
/// Environment variable holding the organization administrator (`user@org`).
pub const ENV_ORG_ADMIN_USR: &str = "ORG_ADMIN_USR";
/// Environment variable holding the organization administrator password.
pub const ENV_ORG_ADMIN_PWD: &str = "ORG_ADMIN_PWD";
/// Environment variable holding the OAuth client id registered at the identity provider.
pub const ENV_IAM_CLIENT_ID: &str = "IAM_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const ENV_IAM_CLIENT_SECRET: &str = "IAM_CLIENT_SECRET";

/// Everything a provisioning run needs to reach both APIs.
///
/// A `Config` is built once when the process starts and handed by reference to
/// every client. Construct it with [`ConfigBuilder`] or [`Config::from_env`].
#[derive(Clone)]
pub struct Config {
    /// Root of the identity provider. The identity API lives under `/identity`.
    pub iam_root: Url,
    /// Root of the vCloud Director installation. The API lives under `/api`.
    pub vcd_root: Url,
    /// Organization administrator used for basic authentication, e.g. `admin@acme`.
    pub org_admin_user: String,
    pub org_admin_password: String,
    /// OAuth client registered at the identity provider for this organization.
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    /// Reads the six `IAM_*`, `VCD_ROOT` and `ORG_ADMIN_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a `Config` from an arbitrary variable lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| VcdOidcError::MissingConfiguration(name.to_string()))
        };

        ConfigBuilder::new()
            .iam_root(&var(ENV_IAM_ROOT)?)?
            .vcd_root(&var(ENV_VCD_ROOT)?)?
            .org_admin(var(ENV_ORG_ADMIN_USR)?, var(ENV_ORG_ADMIN_PWD)?)
            .client_credentials(var(ENV_IAM_CLIENT_ID)?, var(ENV_IAM_CLIENT_SECRET)?)
            .build()
    }

    /// Base URL of the identity API, without a trailing slash.
    pub fn identity_api(&self) -> String {
        format!("{}/identity", self.iam_root.as_str().trim_end_matches('/'))
    }

    /// Base URL of the vCloud API, without a trailing slash.
    pub fn vcd_api(&self) -> String {
        format!("{}/api", self.vcd_root.as_str().trim_end_matches('/'))
    }

    /// Short `"{host}/{org}"` label for progress messages, e.g. `vcd01/acme`.
    pub fn target_label(&self) -> String {
        let host = self
            .vcd_root
            .host_str()
            .and_then(|host| host.split('.').next())
            .filter(|short| !short.is_empty())
            .unwrap_or("N/A");
        let org = self
            .org_admin_user
            .rsplit('@')
            .next()
            .filter(|org| !org.is_empty())
            .unwrap_or("N/A");
        format!("{host}/{org}")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("iam_root", &self.iam_root.as_str())
            .field("vcd_root", &self.vcd_root.as_str())
            .field("org_admin_user", &self.org_admin_user)
            .field("org_admin_password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A builder for creating a `Config` instance.
///
/// All fields are required; `build` reports the first one that is missing.
#[derive(Default)]
pub struct ConfigBuilder {
    iam_root: Option<Url>,
    vcd_root: Option<Url>,
    org_admin: Option<(String, String)>,
    client_credentials: Option<(String, String)>,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identity provider root, e.g. `https://iam.cloud.ibm.com`.
    pub fn iam_root(mut self, url: &str) -> Result<Self> {
        self.iam_root = Some(parse_url(url)?);
        Ok(self)
    }

    /// Sets the vCloud Director root, e.g. `https://vcd01.example.com`.
    pub fn vcd_root(mut self, url: &str) -> Result<Self> {
        self.vcd_root = Some(parse_url(url)?);
        Ok(self)
    }

    /// Sets the organization administrator credentials used to open a session.
    pub fn org_admin(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.org_admin = Some((user.into(), password.into()));
        self
    }

    /// Sets the OAuth client id and secret written into the organization settings.
    pub fn client_credentials(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.client_credentials = Some((id.into(), secret.into()));
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns `MissingConfiguration` naming the first field that was never set.
    pub fn build(self) -> Result<Config> {
        let iam_root = self
            .iam_root
            .ok_or_else(|| VcdOidcError::MissingConfiguration("iam_root".to_string()))?;
        let vcd_root = self
            .vcd_root
            .ok_or_else(|| VcdOidcError::MissingConfiguration("vcd_root".to_string()))?;
        let (org_admin_user, org_admin_password) = self
            .org_admin
            .ok_or_else(|| VcdOidcError::MissingConfiguration("org_admin".to_string()))?;
        let (client_id, client_secret) = self
            .client_credentials
            .ok_or_else(|| VcdOidcError::MissingConfiguration("client_credentials".to_string()))?;

        Ok(Config {
            iam_root,
            vcd_root,
            org_admin_user,
            org_admin_password,
            client_id,
            client_secret,
        })
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| VcdOidcError::InvalidUrl(format!("{url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> HashMap<&'static str, String> {
        HashMap::from([
            (ENV_IAM_ROOT, "https://iam.cloud.ibm.com/".to_string()),
            (ENV_VCD_ROOT, "https://vcd01.fra.example.com".to_string()),
            (ENV_ORG_ADMIN_USR, "admin@acme".to_string()),
            (ENV_ORG_ADMIN_PWD, "hunter2".to_string()),
            (ENV_IAM_CLIENT_ID, "client".to_string()),
            (ENV_IAM_CLIENT_SECRET, "s3cret".to_string()),
        ])
    }

    #[test]
    fn reads_all_variables_and_derives_endpoints() {
        let vars = env();
        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.identity_api(), "https://iam.cloud.ibm.com/identity");
        assert_eq!(config.vcd_api(), "https://vcd01.fra.example.com/api");
        assert_eq!(config.target_label(), "vcd01/acme");
        assert_eq!(config.client_id, "client");
    }

    #[test]
    fn empty_variable_is_reported_as_missing() {
        let mut vars = env();
        vars.insert(ENV_IAM_CLIENT_SECRET, "  ".to_string());
        let err = Config::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, VcdOidcError::MissingConfiguration(name) if name == ENV_IAM_CLIENT_SECRET));
    }

    #[test]
    fn unparsable_root_is_rejected() {
        let mut vars = env();
        vars.insert(ENV_VCD_ROOT, "not a url".to_string());
        let err = Config::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, VcdOidcError::InvalidUrl(_)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let vars = env();
        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn label_falls_back_when_org_is_unknown() {
        let config = ConfigBuilder::new()
            .iam_root("https://iam.example.com")
            .unwrap()
            .vcd_root("https://vcd02.example.com")
            .unwrap()
            .org_admin("admin@", "pw")
            .client_credentials("id", "secret")
            .build()
            .unwrap();
        assert_eq!(config.target_label(), "vcd02/N/A");
    }

    #[test]
    fn build_reports_first_missing_field() {
        let err = ConfigBuilder::new()
            .iam_root("https://iam.example.com")
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, VcdOidcError::MissingConfiguration(field) if field == "vcd_root"));
    }
}
