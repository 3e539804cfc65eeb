// src/error.rs

use thiserror::Error;

/// The primary error type for the `vcd-oidc` library.
#[derive(Debug, Error)]
pub enum VcdOidcError {
    /// A request could not be sent, or either API answered with a non-2xx status.
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The identity provider does not advertise every scope the platform needs.
    #[error("Scopes {required:?} not supported (provider advertises {supported:?})")]
    UnsupportedScopes {
        required: Vec<String>,
        supported: Vec<String>,
    },

    /// The session response lacked the access token header or the `locationId` attribute.
    #[error("Malformed session response: {0}")]
    MalformedSessionResponse(String),

    /// The organization has no role with the requested name.
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// The platform does not advertise a single non-deprecated API version.
    #[error("The platform advertises no supported (non-deprecated) API version")]
    NoSupportedVersion,

    /// A JSON Web Key could not be turned into an RSA public key.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// An XML body could not be read or written.
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// A required configuration field is missing.
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = VcdOidcError> = std::result::Result<T, E>;
