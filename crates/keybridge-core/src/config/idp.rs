use redact::Secret;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdpConfig {
    /// Issuer this proxy reaches the IdP on, used for discovery and
    /// token exchanges.
    pub issuer: Url,

    /// Issuer spelling advertised to clients when it differs from
    /// `issuer`, e.g. split-horizon Keycloak deployments.
    pub public_issuer: Option<Url>,

    pub client_id: String,

    #[serde(
        default = "default_client_secret",
        serialize_with = "redact::serde::redact_secret"
    )]
    pub client_secret: Secret<String>,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Attach a proxy-held PKCE challenge to the upstream authorize leg.
    #[serde(default = "default_upstream_pkce")]
    pub upstream_pkce: bool,
}

fn default_client_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "profile".to_string(),
        "email".to_string(),
    ]
}

fn default_upstream_pkce() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifierConfig {
    /// Accepted `aud` values. Unset falls back to the IdP client_id.
    pub audience: Option<Vec<String>>,

    /// Accepted `iss` values. Unset disables the issuer check entirely,
    /// which keeps tokens minted under a different issuer spelling
    /// verifiable but accepts any issuer the JWKS can vouch for.
    pub issuer: Option<Vec<String>>,

    #[serde(default = "default_leeway")]
    pub leeway: u64,

    #[serde(default = "default_validate_exp")]
    pub validate_exp: bool,

    #[serde(default)]
    pub validate_nbf: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            audience: None,
            issuer: None,
            leeway: default_leeway(),
            validate_exp: true,
            validate_nbf: false,
        }
    }
}

fn default_leeway() -> u64 {
    60
}

fn default_validate_exp() -> bool {
    true
}
