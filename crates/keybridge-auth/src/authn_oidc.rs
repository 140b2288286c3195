use axum::http::{header, request};
use jsonwebtoken::{DecodingKey, Validation};
use keybridge_core::{
    Authentication, Error, Error400, GeneralAuthn, IdpClient, IdpConfig, VerifierConfig,
};
use oauth2::{ClientId, ClientSecret, EndpointMaybeSet, EndpointNotSet, EndpointSet, Scope};
use openidconnect::{core::CoreProviderMetadata, IssuerUrl};
use std::{
    collections::{HashMap, HashSet},
    ops::Deref,
    sync::Arc,
};
use url::Url;

#[derive(Clone)]
pub struct AuthnOidc(pub(crate) Arc<InnerAuthn>);

impl Deref for AuthnOidc {
    type Target = InnerAuthn;

    fn deref(&self) -> &Self::Target {
        Arc::as_ref(&self.0)
    }
}

pub struct InnerAuthn {
    pub(crate) issuer: Url,
    pub(crate) public_issuer: Option<Url>,
    pub(crate) jwks_uri: Url,
    pub(crate) oauth_client:
        IdpClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointMaybeSet>,
    pub(crate) kid_map: HashMap<String, DecodingKey>,
    pub(crate) no_kid_keys: Vec<DecodingKey>,
    pub(crate) client_id: String,
    pub(crate) scopes: Vec<String>,
    pub(crate) validator: VerifierConfig,
}

impl AuthnOidc {
    pub async fn new(
        idp: &IdpConfig,
        verifier: &VerifierConfig,
        reqwest_client: &reqwest::Client,
    ) -> Result<Self, Error> {
        let issuer_url = IssuerUrl::new(idp.issuer.to_string())?;
        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, reqwest_client)
            .await
            .map_err(
                |err: openidconnect::DiscoveryError<oauth2::HttpClientError<reqwest::Error>>| {
                    tracing::error!("Failed to discover OIDC metadata: {}", err);
                    err
                },
            )?;
        if provider_metadata.token_endpoint().is_none() {
            return Err(Error::NoTokenEndpoint);
        }
        tracing::info!(issuer = %idp.issuer, "OIDC discovered");

        let jwks_uri = provider_metadata.jwks_uri().url().clone();
        let jwks: jsonwebtoken::jwk::JwkSet = reqwest_client
            .get(jwks_uri.as_str())
            .send()
            .await?
            .json()
            .await?;

        let mut kid_map = HashMap::new();
        let mut no_kid_keys = Vec::new();
        for key in &jwks.keys {
            let Ok(decoding_key) = DecodingKey::from_jwk(key) else {
                tracing::warn!(kid = ?key.common.key_id, "Skipping unusable JWK");
                continue;
            };
            if let Some(kid) = &key.common.key_id {
                kid_map.insert(kid.clone(), decoding_key);
            } else {
                no_kid_keys.push(decoding_key);
            }
        }

        let mut client = IdpClient::new(ClientId::new(idp.client_id.clone()));
        if !idp.client_secret.expose_secret().is_empty() {
            client = client.set_client_secret(ClientSecret::new(
                idp.client_secret.expose_secret().to_string(),
            ));
        }
        let oauth_client = client
            .set_auth_uri(provider_metadata.authorization_endpoint().clone())
            .set_token_uri_option(provider_metadata.token_endpoint().cloned());

        Ok(AuthnOidc(Arc::new(InnerAuthn {
            issuer: idp.issuer.clone(),
            public_issuer: idp.public_issuer.clone(),
            jwks_uri,
            oauth_client,
            kid_map,
            no_kid_keys,
            client_id: idp.client_id.clone(),
            scopes: idp.scopes.clone(),
            validator: verifier.clone(),
        })))
    }
}

impl InnerAuthn {
    /// Swaps the internal issuer prefix for the advertised one, when
    /// the two differ.
    fn to_public(&self, url: &Url) -> Url {
        let Some(public_issuer) = &self.public_issuer else {
            return url.clone();
        };
        let internal = self.issuer.as_str().trim_end_matches('/');
        let public = public_issuer.as_str().trim_end_matches('/');
        match url.as_str().strip_prefix(internal) {
            Some(rest) => {
                Url::parse(&format!("{public}{rest}")).unwrap_or_else(|_| url.clone())
            }
            None => url.clone(),
        }
    }

    fn pick_key_by_header<'a>(
        &'a self,
        header: &jsonwebtoken::Header,
    ) -> Box<dyn Iterator<Item = &'a DecodingKey> + 'a> {
        if let Some(kid) = &header.kid {
            if let Some(dec_key) = self.kid_map.get(kid) {
                return Box::new(std::iter::once(dec_key));
            }
        }
        Box::new(self.no_kid_keys.iter().chain(self.kid_map.values()))
    }

    fn prepare_validator(&self, header: &jsonwebtoken::Header) -> Validation {
        let mut validator = Validation::new(header.alg);
        validator.leeway = self.validator.leeway;
        validator.validate_exp = self.validator.validate_exp;
        validator.validate_nbf = self.validator.validate_nbf;
        if !self.validator.validate_exp {
            validator.required_spec_claims = HashSet::new();
        }
        match &self.validator.audience {
            Some(audience) => validator.set_audience(audience),
            None => validator.set_audience(&[&self.client_id]),
        }
        // iss stays unchecked unless configured
        if let Some(issuer) = &self.validator.issuer {
            validator.set_issuer(issuer);
        }
        validator
    }
}

impl GeneralAuthn for InnerAuthn {
    fn create_oauth_client(
        &self,
    ) -> IdpClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointMaybeSet>
    {
        self.oauth_client.clone()
    }

    fn issuer_url(&self) -> Url {
        self.to_public(&self.issuer)
    }

    fn jwks_url(&self) -> Url {
        self.to_public(&self.jwks_uri)
    }

    fn scopes(&self) -> Vec<Scope> {
        self.scopes.iter().cloned().map(Scope::new).collect()
    }

    async fn authenticate(&self, target: &request::Parts) -> Result<Authentication, Error> {
        let Some(authorization) = target.headers.get(header::AUTHORIZATION) else {
            return Ok(Authentication::NoAuth);
        };
        let data = authorization
            .to_str()
            .map_err(|_| Error::BadRequest(Error400::InvalidHeaderString(header::AUTHORIZATION)))?;
        let mut data_splited = data.split_whitespace();
        let first_data = data_splited.next().unwrap_or_default();
        let second_data = data_splited.next().unwrap_or_default();
        match (
            first_data.trim().to_lowercase().as_str(),
            second_data.trim(),
        ) {
            ("bearer", token) => {
                let header = jsonwebtoken::decode_header(token)
                    .map_err(|_| Error::BadRequest(Error400::InvalidToken("Invalid token header")))?;
                let validator = self.prepare_validator(&header);
                let mut failures = Vec::new();
                for key in self.pick_key_by_header(&header) {
                    match jsonwebtoken::decode::<serde_json::Value>(token, key, &validator) {
                        Ok(data) => return Ok(Authentication::Jwt { jwt: data }),
                        Err(e) => failures.push(e),
                    }
                }
                tracing::info!("Failed to validate token: {:#?}", &failures);
                Err(Error::BadRequest(Error400::InvalidToken(
                    "No valid key for jwt token",
                )))
            }
            (authn_type, _) => Err(Error::BadRequest(Error400::BearerTokenExpected(
                authn_type.to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::Utc;
    use jsonwebtoken::{jwk::JwkSet, Algorithm, EncodingKey, Header};
    use oauth2::{AuthUrl, TokenUrl};

    const SECRET: &[u8] = b"keybridge-test-signing-secret";

    fn test_authn(verifier: VerifierConfig) -> InnerAuthn {
        let jwks: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [{
                "kty": "oct",
                "kid": "test-key",
                "alg": "HS256",
                "k": URL_SAFE_NO_PAD.encode(SECRET),
            }]
        }))
        .unwrap();

        let mut kid_map = HashMap::new();
        for key in &jwks.keys {
            kid_map.insert(
                key.common.key_id.clone().unwrap(),
                DecodingKey::from_jwk(key).unwrap(),
            );
        }

        InnerAuthn {
            issuer: Url::parse("http://keycloak.internal:8080/realms/mcp").unwrap(),
            public_issuer: None,
            jwks_uri: Url::parse(
                "http://keycloak.internal:8080/realms/mcp/protocol/openid-connect/certs",
            )
            .unwrap(),
            oauth_client: IdpClient::new(ClientId::new("proxy-client".to_string()))
                .set_auth_uri(
                    AuthUrl::new("http://keycloak.internal:8080/auth".to_string()).unwrap(),
                )
                .set_token_uri_option(Some(
                    TokenUrl::new("http://keycloak.internal:8080/token".to_string()).unwrap(),
                )),
            kid_map,
            no_kid_keys: Vec::new(),
            client_id: "proxy-client".to_string(),
            scopes: vec!["openid".to_string()],
            validator: verifier,
        }
    }

    fn sign_token(claims: serde_json::Value) -> String {
        let header = Header {
            kid: Some("test-key".to_string()),
            ..Header::new(Algorithm::HS256)
        };
        jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn request_with_authorization(value: Option<&str>) -> request::Parts {
        let mut builder = Request::builder().uri("/mcp");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn valid_bearer_token_authenticates() {
        let authn = test_authn(VerifierConfig::default());
        let token = sign_token(serde_json::json!({
            "sub": "user-1",
            "aud": "proxy-client",
            "iss": "http://keycloak.internal:8080/realms/mcp",
            "exp": Utc::now().timestamp() + 600,
        }));
        let parts = request_with_authorization(Some(&format!("Bearer {token}")));

        let authentication = authn.authenticate(&parts).await.unwrap();
        match authentication {
            Authentication::Jwt { jwt } => {
                assert_eq!(jwt.claims["sub"], "user-1");
            }
            Authentication::NoAuth => panic!("expected a verified JWT"),
        }
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let authn = test_authn(VerifierConfig::default());
        let token = sign_token(serde_json::json!({
            "sub": "user-1",
            "aud": "someone-else",
            "exp": Utc::now().timestamp() + 600,
        }));
        let parts = request_with_authorization(Some(&format!("Bearer {token}")));

        assert!(authn.authenticate(&parts).await.is_err());
    }

    #[tokio::test]
    async fn issuer_unset_accepts_any_issuer() {
        let authn = test_authn(VerifierConfig::default());
        let token = sign_token(serde_json::json!({
            "sub": "user-1",
            "aud": "proxy-client",
            "iss": "http://somewhere.else/realms/other",
            "exp": Utc::now().timestamp() + 600,
        }));
        let parts = request_with_authorization(Some(&format!("Bearer {token}")));

        assert!(authn.authenticate(&parts).await.is_ok());
    }

    #[tokio::test]
    async fn issuer_set_rejects_foreign_issuer() {
        let authn = test_authn(VerifierConfig {
            issuer: Some(vec![
                "http://keycloak.internal:8080/realms/mcp".to_string()
            ]),
            ..VerifierConfig::default()
        });
        let token = sign_token(serde_json::json!({
            "sub": "user-1",
            "aud": "proxy-client",
            "iss": "http://somewhere.else/realms/other",
            "exp": Utc::now().timestamp() + 600,
        }));
        let parts = request_with_authorization(Some(&format!("Bearer {token}")));

        assert!(authn.authenticate(&parts).await.is_err());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let authn = test_authn(VerifierConfig {
            leeway: 0,
            ..VerifierConfig::default()
        });
        let token = sign_token(serde_json::json!({
            "sub": "user-1",
            "aud": "proxy-client",
            "exp": Utc::now().timestamp() - 600,
        }));
        let parts = request_with_authorization(Some(&format!("Bearer {token}")));

        assert!(authn.authenticate(&parts).await.is_err());
    }

    #[tokio::test]
    async fn missing_header_is_noauth() {
        let authn = test_authn(VerifierConfig::default());
        let parts = request_with_authorization(None);

        let authentication = authn.authenticate(&parts).await.unwrap();
        assert!(matches!(authentication, Authentication::NoAuth));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let authn = test_authn(VerifierConfig::default());
        let parts = request_with_authorization(Some("Basic dXNlcjpwYXNz"));

        assert!(authn.authenticate(&parts).await.is_err());
    }

    #[test]
    fn public_issuer_rewrites_jwks_url() {
        let mut authn = test_authn(VerifierConfig::default());
        authn.public_issuer = Some(Url::parse("https://login.example.com/realms/mcp").unwrap());

        assert_eq!(
            authn.jwks_url().as_str(),
            "https://login.example.com/realms/mcp/protocol/openid-connect/certs"
        );
        assert_eq!(
            authn.issuer_url().as_str(),
            "https://login.example.com/realms/mcp"
        );
    }
}
