// src/document.rs

//! XML payloads sent to the vCloud admin API.
//!
//! The platform validates these documents against an order-sensitive schema, so
//! each document is described as a fixed, ordered list of [`Node`]s and written
//! out top-to-bottom.

use crate::error::{Result, VcdOidcError};
use crate::keys::jwk_to_pem;
use crate::model::{OidcConfiguration, SigningKey};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt::Display;

/// Default namespace of the vCloud 1.5+ object model.
pub const VCLOUD_NAMESPACE: &str = "http://www.vmware.com/vcloud/v1.5";
/// Media type of the organization OAuth settings resource.
pub const OAUTH_SETTINGS_MEDIA_TYPE: &str = "application/vnd.vmware.admin.organizationOAuthSettings+xml";
/// Media type of an organization user.
pub const USER_MEDIA_TYPE: &str = "application/vnd.vmware.admin.user+xml";

/// Tolerated clock skew between the platform and the identity provider, in seconds.
const MAX_CLOCK_SKEW_SECS: u32 = 600;

/// Claim names the platform reads user attributes from, in schema order.
const OIDC_ATTRIBUTE_MAPPING: [(&str, &str); 6] = [
    ("SubjectAttributeName", "email"),
    ("EmailAttributeName", "email"),
    ("FirstNameAttributeName", "given_name"),
    ("LastNameAttributeName", "family_name"),
    ("GroupsAttributeName", "groups"),
    ("RolesAttributeName", "roles"),
];

/// One element of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `<tag>value</tag>`
    Text { tag: &'static str, value: String },
    /// `<tag>children…</tag>`
    Group { tag: &'static str, children: Vec<Node> },
    /// `<tag attr="…"/>`
    Empty {
        tag: &'static str,
        attributes: Vec<(&'static str, String)>,
    },
}

impl Node {
    fn text(tag: &'static str, value: impl Into<String>) -> Self {
        Node::Text { tag, value: value.into() }
    }
}

/// A signing key as the platform stores it: id, algorithm label and PEM public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthKeyConfiguration {
    pub key_id: String,
    pub algorithm: String,
    pub key_pem: String,
}

impl TryFrom<&SigningKey> for OAuthKeyConfiguration {
    type Error = VcdOidcError;

    fn try_from(key: &SigningKey) -> Result<Self> {
        Ok(Self {
            key_id: key.kid.clone(),
            algorithm: key.kty.clone(),
            key_pem: jwk_to_pem(&key.n, &key.e)?,
        })
    }
}

/// The organization-level OAuth/OIDC settings (`OrgOAuthSettings`).
#[derive(Debug, Clone)]
pub struct OAuthSettingsDocument {
    pub issuer_id: String,
    pub keys: Vec<OAuthKeyConfiguration>,
    pub client_id: String,
    pub client_secret: String,
    pub user_authorization_endpoint: String,
    pub access_token_endpoint: String,
    pub user_info_endpoint: String,
    pub scopes: Vec<String>,
}

impl OAuthSettingsDocument {
    pub fn new(
        oidc: &OidcConfiguration,
        keys: Vec<OAuthKeyConfiguration>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            issuer_id: oidc.issuer.clone(),
            keys,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_authorization_endpoint: oidc.authorization_endpoint.clone(),
            access_token_endpoint: oidc.token_endpoint.clone(),
            user_info_endpoint: oidc.userinfo_endpoint.clone(),
            scopes: oidc.scopes.clone(),
        }
    }

    /// The document body in schema order.
    pub fn nodes(&self) -> Vec<Node> {
        let key_configurations = self
            .keys
            .iter()
            .map(|key| Node::Group {
                tag: "OAuthKeyConfiguration",
                children: vec![
                    Node::text("KeyId", &key.key_id),
                    Node::text("Algorithm", &key.algorithm),
                    Node::text("Key", &key.key_pem),
                ],
            })
            .collect();

        let attribute_mapping = OIDC_ATTRIBUTE_MAPPING
            .iter()
            .map(|&(tag, claim)| Node::text(tag, claim))
            .collect();

        vec![
            Node::text("IssuerId", &self.issuer_id),
            Node::Group {
                tag: "OAuthKeyConfigurations",
                children: key_configurations,
            },
            Node::text("Enabled", "true"),
            Node::text("ClientId", &self.client_id),
            Node::text("ClientSecret", &self.client_secret),
            Node::text("UserAuthorizationEndpoint", &self.user_authorization_endpoint),
            Node::text("AccessTokenEndpoint", &self.access_token_endpoint),
            Node::text("UserInfoEndpoint", &self.user_info_endpoint),
            Node::text("Scope", self.scopes.join(" ")),
            Node::Group {
                tag: "OIDCAttributeMapping",
                children: attribute_mapping,
            },
            Node::text("MaxClockSkew", MAX_CLOCK_SKEW_SECS.to_string()),
        ]
    }

    pub fn to_xml(&self) -> Result<String> {
        render(
            "OrgOAuthSettings",
            &[("xmlns", VCLOUD_NAMESPACE), ("type", OAUTH_SETTINGS_MEDIA_TYPE)],
            &self.nodes(),
        )
    }
}

/// An external (OAuth) user bound to a role (`User`).
#[derive(Debug, Clone)]
pub struct UserDocument {
    pub name: String,
    pub role_href: String,
}

impl UserDocument {
    pub fn new(name: impl Into<String>, role_href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role_href: role_href.into(),
        }
    }

    pub fn nodes(&self) -> Vec<Node> {
        vec![
            Node::text("IsEnabled", "true"),
            Node::text("IsExternal", "true"),
            Node::text("ProviderType", "OAUTH"),
            Node::Empty {
                tag: "Role",
                attributes: vec![("href", self.role_href.clone())],
            },
        ]
    }

    pub fn to_xml(&self) -> Result<String> {
        render(
            "User",
            &[("xmlns", VCLOUD_NAMESPACE), ("name", self.name.as_str())],
            &self.nodes(),
        )
    }
}

fn render(root: &str, attributes: &[(&str, &str)], nodes: &[Node]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new(root).with_attributes(attributes.iter().copied())))
        .map_err(xml_error)?;
    for node in nodes {
        write_node(&mut writer, node)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(root)))
        .map_err(xml_error)?;

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    match node {
        Node::Text { tag, value } => {
            writer.write_event(Event::Start(BytesStart::new(*tag))).map_err(xml_error)?;
            writer.write_event(Event::Text(BytesText::new(value))).map_err(xml_error)?;
            writer.write_event(Event::End(BytesEnd::new(*tag))).map_err(xml_error)?;
        }
        Node::Group { tag, children } => {
            writer.write_event(Event::Start(BytesStart::new(*tag))).map_err(xml_error)?;
            for child in children {
                write_node(writer, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(*tag))).map_err(xml_error)?;
        }
        Node::Empty { tag, attributes } => {
            let element = BytesStart::new(*tag)
                .with_attributes(attributes.iter().map(|(name, value)| (*name, value.as_str())));
            writer.write_event(Event::Empty(element)).map_err(xml_error)?;
        }
    }
    Ok(())
}

fn xml_error(err: impl Display) -> VcdOidcError {
    VcdOidcError::MalformedXml(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oidc() -> OidcConfiguration {
        OidcConfiguration {
            issuer: "https://iam.example.com/identity".to_string(),
            authorization_endpoint: "https://iam.example.com/identity/authorize".to_string(),
            token_endpoint: "https://iam.example.com/identity/token".to_string(),
            userinfo_endpoint: "https://iam.example.com/identity/userinfo".to_string(),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        }
    }

    fn settings() -> OAuthSettingsDocument {
        let keys = vec![
            OAuthKeyConfiguration {
                key_id: "20240101".to_string(),
                algorithm: "RSA".to_string(),
                key_pem: "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----".to_string(),
            },
            OAuthKeyConfiguration {
                key_id: "20240201".to_string(),
                algorithm: "RSA".to_string(),
                key_pem: "-----BEGIN PUBLIC KEY-----\nBBBB\n-----END PUBLIC KEY-----".to_string(),
            },
        ];
        OAuthSettingsDocument::new(&oidc(), keys, "client-id", "client-secret")
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle} not found in {haystack}"))
    }

    #[test]
    fn oauth_settings_elements_follow_schema_order() {
        let xml = settings().to_xml().unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0"?><OrgOAuthSettings xmlns="http://www.vmware.com/vcloud/v1.5" type="application/vnd.vmware.admin.organizationOAuthSettings+xml">"#));
        let order = [
            "<IssuerId>https://iam.example.com/identity</IssuerId>",
            "<OAuthKeyConfigurations><OAuthKeyConfiguration><KeyId>20240101</KeyId><Algorithm>RSA</Algorithm><Key>-----BEGIN PUBLIC KEY-----\nAAAA",
            "<KeyId>20240201</KeyId>",
            "<Enabled>true</Enabled>",
            "<ClientId>client-id</ClientId>",
            "<ClientSecret>client-secret</ClientSecret>",
            "<UserAuthorizationEndpoint>https://iam.example.com/identity/authorize</UserAuthorizationEndpoint>",
            "<AccessTokenEndpoint>https://iam.example.com/identity/token</AccessTokenEndpoint>",
            "<UserInfoEndpoint>https://iam.example.com/identity/userinfo</UserInfoEndpoint>",
            "<Scope>openid email profile</Scope>",
            "<OIDCAttributeMapping><SubjectAttributeName>email</SubjectAttributeName><EmailAttributeName>email</EmailAttributeName><FirstNameAttributeName>given_name</FirstNameAttributeName><LastNameAttributeName>family_name</LastNameAttributeName><GroupsAttributeName>groups</GroupsAttributeName><RolesAttributeName>roles</RolesAttributeName></OIDCAttributeMapping>",
            "<MaxClockSkew>600</MaxClockSkew></OrgOAuthSettings>",
        ];
        let positions: Vec<usize> = order.iter().map(|needle| position(&xml, needle)).collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "out of order: {xml}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let document = settings();
        assert_eq!(document.to_xml().unwrap(), document.to_xml().unwrap());
        assert_eq!(document.nodes(), settings().nodes());
    }

    #[test]
    fn user_document_carries_name_and_role() {
        let xml = UserDocument::new("alice@example.com", "https://vcd/api/admin/role/55")
            .to_xml()
            .unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0"?>"#,
                r#"<User xmlns="http://www.vmware.com/vcloud/v1.5" name="alice@example.com">"#,
                "<IsEnabled>true</IsEnabled>",
                "<IsExternal>true</IsExternal>",
                "<ProviderType>OAUTH</ProviderType>",
                r#"<Role href="https://vcd/api/admin/role/55"/>"#,
                "</User>"
            )
        );
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let xml = UserDocument::new("o'brien&co@example.com", "https://vcd/role?a=1&b=2")
            .to_xml()
            .unwrap();
        assert!(xml.contains("&amp;co@example.com"));
        assert!(xml.contains(r#"href="https://vcd/role?a=1&amp;b=2""#));
    }
}
