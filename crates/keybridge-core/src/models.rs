use chrono::{DateTime, Utc};
use jsonwebtoken::TokenData;
use oauth2::{
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
    Client, EndpointNotSet, ExtraTokenFields, StandardRevocableToken, StandardTokenResponse,
};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone)]
pub enum Authentication {
    Jwt { jwt: TokenData<serde_json::Value> },
    NoAuth,
}

/// Token members beyond the RFC 6749 core set, kept as raw JSON so IdP
/// specific fields (id_token, session_state, ...) survive the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassthroughExtraFields {
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExtraTokenFields for PassthroughExtraFields {}

pub type IdpTokenResponse = StandardTokenResponse<PassthroughExtraFields, BasicTokenType>;

pub type IdpClient<
    HasAuthUrl = EndpointNotSet,
    HasDeviceAuthUrl = EndpointNotSet,
    HasIntrospectionUrl = EndpointNotSet,
    HasRevocationUrl = EndpointNotSet,
    HasTokenUrl = EndpointNotSet,
> = Client<
    BasicErrorResponse,
    IdpTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    HasAuthUrl,
    HasDeviceAuthUrl,
    HasIntrospectionUrl,
    HasRevocationUrl,
    HasTokenUrl,
>;

/// Pending authorization leg, keyed by the upstream `state` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_id: String,
    pub client_redirect_uri: Url,
    pub client_state: Option<String>,
    pub client_pkce_challenge: String,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub upstream_pkce_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Single-use code handed to the client after the upstream exchange,
/// carrying the IdP token payload the client will redeem at `/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyAuthorizationCode {
    pub code: String,
    pub client_redirect_uri: Url,
    pub client_pkce_challenge: String,
    pub client_id: Option<String>,
    pub idp_tokens: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ProxyAuthorizationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Leading characters of a capability token, safe for log lines.
pub fn token_fragment(token: &str) -> &str {
    token.get(..token.len().min(8)).unwrap_or("")
}
