// src/model.rs

use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;

/// The scopes the platform requests on every login. The identity provider must support all of them.
pub const REQUIRED_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Represents the data structure of an OIDC provider's discovery document.
/// Found at the `.well-known/openid-configuration` endpoint.
#[derive(Debug, Deserialize)]
pub struct OidcDiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
}

/// The subset of the discovery document the platform needs, narrowed to the required scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    /// Always [`REQUIRED_SCOPES`], in that order; never the full advertised list.
    pub scopes: Vec<String>,
}

/// A single signing key as published in the provider's key set.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningKey {
    pub kid: String,
    pub kty: String,
    /// Base64url-encoded modulus.
    pub n: String,
    /// Base64url-encoded public exponent.
    pub e: String,
}

/// The provider's key set (`{"keys": [...]}`).
#[derive(Debug, Deserialize)]
pub struct SigningKeySet {
    pub keys: Vec<SigningKey>,
}

/// A vCloud API version string such as `"37.0"`.
///
/// Versions order by their dot-separated numeric components, so `"9.0" < "10.0"`.
/// Components that are not numbers sort after numeric ones and compare as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiVersion(String);

impl ApiVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.0.split('.');
        let mut right = other.0.split('.');
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
                        (Ok(a), Ok(b)) => a.cmp(&b),
                        (Ok(_), Err(_)) => Ordering::Less,
                        (Err(_), Ok(_)) => Ordering::Greater,
                        (Err(_), Err(_)) => a.cmp(b),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
            }
        }
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An authenticated vCloud API session, valid for one run.
///
/// Holding one lets a caller run several operations without negotiating again.
#[derive(Clone)]
pub struct VcdSession {
    pub version: ApiVersion,
    pub token: String,
    pub org_id: String,
}

impl fmt::Debug for VcdSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcdSession")
            .field("version", &self.version)
            .field("token", &"<redacted>")
            .field("org_id", &self.org_id)
            .finish()
    }
}

/// Result page of a `format=records` role query.
#[derive(Debug, Deserialize)]
pub struct RoleQueryResult {
    #[serde(default)]
    pub record: Vec<RoleRecord>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRecord {
    pub href: String,
}
