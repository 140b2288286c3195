mod authn_oidc;
pub mod pkce;

pub use authn_oidc::*;

use axum::http::request;
use keybridge_core::{Authentication, Config, Error, GeneralAuthn};

#[derive(Clone)]
pub enum Authn {
    Oidc(AuthnOidc),
}

impl Authn {
    pub async fn new(config: &Config, reqwest_client: &reqwest::Client) -> Result<Self, Error> {
        let authn = AuthnOidc::new(&config.idp, &config.verifier, reqwest_client).await?;
        Ok(Authn::Oidc(authn))
    }
}

impl GeneralAuthn for Authn {
    fn create_oauth_client(
        &self,
    ) -> keybridge_core::IdpClient<
        oauth2::EndpointSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointMaybeSet,
    > {
        match self {
            Authn::Oidc(authn) => authn.create_oauth_client(),
        }
    }

    fn issuer_url(&self) -> url::Url {
        match self {
            Authn::Oidc(authn) => authn.issuer_url(),
        }
    }

    fn jwks_url(&self) -> url::Url {
        match self {
            Authn::Oidc(authn) => authn.jwks_url(),
        }
    }

    fn scopes(&self) -> Vec<oauth2::Scope> {
        match self {
            Authn::Oidc(authn) => authn.scopes(),
        }
    }

    async fn authenticate(&self, target: &request::Parts) -> Result<Authentication, Error> {
        match self {
            Authn::Oidc(authn) => authn.authenticate(target).await,
        }
    }
}
