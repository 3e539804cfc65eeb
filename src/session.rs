// src/session.rs

use crate::config::Config;
use crate::error::{Result, VcdOidcError};
use crate::model::{ApiVersion, VcdSession};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Display;
use tracing::{debug, info, instrument};

/// Response header carrying the bearer token of a new session.
pub const ACCESS_TOKEN_HEADER: &str = "X-VMWARE-VCLOUD-ACCESS-TOKEN";

const SESSION_MEDIA_TYPE: &str = "application/vnd.vmware.vcloud.session+xml";

/// `Accept` value for XML responses pinned to `version`.
pub(crate) fn accept_xml(version: &ApiVersion) -> String {
    format!("application/*+xml;version={version}")
}

/// `Accept` value for JSON responses pinned to `version`.
pub(crate) fn accept_json(version: &ApiVersion) -> String {
    format!("application/*+json;version={version}")
}

/// Negotiates the API version and opens authenticated sessions against vCloud Director.
#[derive(Clone)]
pub struct SessionClient {
    http_client: reqwest::Client,
    vcd_api: String,
    username: String,
    password: String,
}

impl SessionClient {
    pub fn new(http_client: reqwest::Client, config: &Config) -> Self {
        Self {
            http_client,
            vcd_api: config.vcd_api(),
            username: config.org_admin_user.clone(),
            password: config.org_admin_password.clone(),
        }
    }

    /// Returns the newest API version the platform still supports.
    ///
    /// # Errors
    ///
    /// `HttpError` on a failed request, `MalformedXml` if the catalogue cannot be
    /// read, `NoSupportedVersion` if every advertised version is deprecated.
    #[instrument(skip(self), err)]
    pub async fn negotiate_api_version(&self) -> Result<ApiVersion> {
        let url = format!("{}/versions", self.vcd_api);
        let body = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let version = latest_supported_version(&body)?;
        debug!(%version, "Negotiated API version");
        Ok(version)
    }

    /// Logs in as the organization administrator using `version`.
    ///
    /// # Errors
    ///
    /// `HttpError` on a failed request, `MalformedSessionResponse` if the token
    /// header or the `locationId` attribute is missing.
    #[instrument(skip(self), fields(user = %self.username), err)]
    pub async fn open_session(&self, version: &ApiVersion) -> Result<VcdSession> {
        let url = format!("{}/sessions", self.vcd_api);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, accept_xml(version))
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("{SESSION_MEDIA_TYPE};version={version}"),
            )
            .send()
            .await?
            .error_for_status()?;

        let token = response
            .headers()
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                VcdOidcError::MalformedSessionResponse(format!("missing {ACCESS_TOKEN_HEADER} header"))
            })?;

        let body = response.text().await?;
        let org_id = org_id_from_session(&body)?;

        info!(org_id = %org_id, "Opened vCloud session");
        Ok(VcdSession {
            version: version.clone(),
            token,
            org_id,
        })
    }
}

/// Picks the highest non-deprecated `VersionInfo/Version` in a versions catalogue.
///
/// Only entries whose `deprecated` attribute is exactly `"false"` qualify.
/// Versions are compared numerically, so the catalogue order does not matter.
pub fn latest_supported_version(catalogue: &str) -> Result<ApiVersion> {
    supported_versions(catalogue)?
        .into_iter()
        .max()
        .ok_or(VcdOidcError::NoSupportedVersion)
}

fn supported_versions(catalogue: &str) -> Result<Vec<ApiVersion>> {
    let mut reader = Reader::from_str(catalogue);
    let mut versions = Vec::new();
    // Some(qualifies) while inside a VersionInfo whose Version has not been read yet.
    let mut pending: Option<bool> = None;
    let mut in_version = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"VersionInfo" => {
                let deprecated = attribute(&e, "deprecated")?;
                pending = Some(deprecated.as_deref() == Some("false"));
            }
            Event::Start(e) if e.local_name().as_ref() == b"Version" && pending.is_some() => {
                in_version = true;
            }
            Event::Text(text) if in_version => {
                let value = text.unescape().map_err(xml_error)?;
                if pending.take() == Some(true) {
                    versions.push(ApiVersion::new(value.trim()));
                }
                in_version = false;
            }
            Event::End(e) if e.local_name().as_ref() == b"Version" => in_version = false,
            Event::End(e) if e.local_name().as_ref() == b"VersionInfo" => pending = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(versions)
}

/// Extracts the organization id from a session body's root `locationId` (`"<org>@<site>"`).
pub fn org_id_from_session(body: &str) -> Result<String> {
    let mut reader = Reader::from_str(body);

    let location = loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) => break attribute(&e, "locationId")?,
            Event::Eof => break None,
            _ => {}
        }
    };

    location
        .as_deref()
        .and_then(|location| location.split('@').next())
        .filter(|org_id| !org_id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| VcdOidcError::MalformedSessionResponse("missing locationId attribute".to_string()))
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match element.try_get_attribute(name).map_err(xml_error)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned())),
        None => Ok(None),
    }
}

fn xml_error(err: impl Display) -> VcdOidcError {
    VcdOidcError::MalformedXml(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue(entries: &[(&str, &str)]) -> String {
        let infos: String = entries
            .iter()
            .map(|(version, deprecated)| {
                format!(
                    r#"<VersionInfo deprecated="{deprecated}"><Version>{version}</Version><LoginUrl>https://vcd/api/sessions</LoginUrl></VersionInfo>"#
                )
            })
            .collect();
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><SupportedVersions xmlns="http://www.vmware.com/vcloud/versions">{infos}</SupportedVersions>"#)
    }

    #[test]
    fn skips_deprecated_versions() {
        let xml = catalogue(&[("1.0", "true"), ("2.0", "false"), ("3.0", "true")]);
        assert_eq!(latest_supported_version(&xml).unwrap(), ApiVersion::new("2.0"));
    }

    #[test]
    fn picks_highest_version_regardless_of_order() {
        let xml = catalogue(&[("37.0", "false"), ("9.0", "false"), ("36.3", "false")]);
        assert_eq!(latest_supported_version(&xml).unwrap(), ApiVersion::new("37.0"));
    }

    #[test]
    fn only_literal_false_qualifies() {
        let xml = catalogue(&[("5.0", "FALSE"), ("4.0", "false")]);
        assert_eq!(latest_supported_version(&xml).unwrap(), ApiVersion::new("4.0"));

        let missing = r#"<SupportedVersions><VersionInfo><Version>6.0</Version></VersionInfo></SupportedVersions>"#;
        assert!(matches!(latest_supported_version(missing), Err(VcdOidcError::NoSupportedVersion)));
    }

    #[test]
    fn all_deprecated_is_no_supported_version() {
        let xml = catalogue(&[("1.0", "true"), ("2.0", "true")]);
        assert!(matches!(latest_supported_version(&xml), Err(VcdOidcError::NoSupportedVersion)));
    }

    #[test]
    fn org_id_is_the_part_before_the_at_sign() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Session xmlns="http://www.vmware.com/vcloud/v1.5" user="admin" org="acme" locationId="abcd@org42" type="application/vnd.vmware.vcloud.session+xml">
    <Link rel="down" href="https://vcd/api/org/"/>
</Session>"#;
        assert_eq!(org_id_from_session(body).unwrap(), "abcd");
    }

    #[test]
    fn missing_location_id_is_malformed() {
        let body = r#"<Session user="admin"/>"#;
        assert!(matches!(
            org_id_from_session(body),
            Err(VcdOidcError::MalformedSessionResponse(_))
        ));
    }
}
