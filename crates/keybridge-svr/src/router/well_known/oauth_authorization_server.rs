use axum::{extract::State, Extension, Json};
use keybridge_auth::Authn;
use keybridge_core::{Config, Error, GeneralAuthn};
use serde::Serialize;

use crate::middlewares::RequestOrigin;

#[derive(Debug, Serialize)]
pub struct Response {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: String,
    pub jwks_uri: String,
    pub scopes_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
}

/// RFC 8414 document naming this proxy, not the IdP, as the
/// authorization server. Rebuilt per request so every public origin the
/// proxy is reached under describes itself.
pub(crate) async fn handler(
    origin: RequestOrigin,
    State(config): State<Config>,
    Extension(authn): Extension<Authn>,
) -> Result<Json<Response>, Error> {
    let authorization_endpoint = origin.join("/authorize")?;
    let token_endpoint = origin.join("/token")?;
    let registration_endpoint = origin.join("/register")?;

    Ok(Json(Response {
        issuer: origin.origin_str().to_string(),
        authorization_endpoint: authorization_endpoint.to_string(),
        token_endpoint: token_endpoint.to_string(),
        registration_endpoint: registration_endpoint.to_string(),
        jwks_uri: authn.jwks_url().to_string(),
        scopes_supported: config.idp.scopes.clone(),
        response_types_supported: vec!["code".to_string()],
        grant_types_supported: vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
        ],
        token_endpoint_auth_methods_supported: vec![
            "client_secret_basic".to_string(),
            "client_secret_post".to_string(),
        ],
        code_challenge_methods_supported: vec!["S256".to_string()],
    }))
}
