use axum::{
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use http::StatusCode;
use keybridge_auth::{pkce, Authn};
use keybridge_core::{token_fragment, GeneralAuthn, GeneralFlowStore};
use keybridge_store::FlowStore;
use oauth2::{basic::BasicErrorResponse, RefreshToken, RequestTokenError};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct Body {
    grant_type: String,
    code: Option<String>,
    redirect_uri: Option<String>,
    client_id: Option<String>,
    code_verifier: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("{description}")]
    InvalidRequest { description: &'static str },

    #[error("{description}")]
    InvalidGrant { description: &'static str },

    #[error("Unsupported grant_type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },

    /// The IdP answered the refresh with an OAuth error of its own,
    /// relayed to the client verbatim.
    #[error("{0}")]
    Rejected(BasicErrorResponse),

    #[error("The identity provider did not answer the token request")]
    UpstreamFailure,

    #[error(transparent)]
    Internal(#[from] keybridge_core::Error),
}

impl TokenError {
    fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidRequest { .. } => "invalid_request",
            TokenError::InvalidGrant { .. } => "invalid_grant",
            TokenError::UnsupportedGrantType { .. } => "unsupported_grant_type",
            TokenError::Rejected(_) => "server_error",
            TokenError::UpstreamFailure => "server_error",
            TokenError::Internal(_) => "server_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            TokenError::Rejected(_) => StatusCode::BAD_REQUEST,
            TokenError::UpstreamFailure => StatusCode::BAD_GATEWAY,
            TokenError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let body = match &self {
            TokenError::Rejected(response) => serde_json::to_value(response).unwrap_or_else(|_| {
                serde_json::json!({ "error": "server_error" })
            }),
            _ => serde_json::json!({
                "error": self.code(),
                "error_description": self.to_string(),
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}

pub async fn handler(
    Extension(client): Extension<reqwest::Client>,
    Extension(authn): Extension<Authn>,
    Extension(store): Extension<FlowStore>,
    Form(body): Form<Body>,
) -> Result<Json<serde_json::Value>, TokenError> {
    match body.grant_type.as_str() {
        "authorization_code" => exchange_authorization_code(&store, &body).await,
        "refresh_token" => forward_refresh(&client, &authn, &body).await,
        grant_type => Err(TokenError::UnsupportedGrantType {
            grant_type: grant_type.to_string(),
        }),
    }
}

/// Redeems a proxy code for the stored upstream tokens. The take is the
/// single-use gate: whatever else fails afterwards, the code is spent.
async fn exchange_authorization_code(
    store: &FlowStore,
    body: &Body,
) -> Result<Json<serde_json::Value>, TokenError> {
    let Some(code) = body.code.as_deref() else {
        return Err(TokenError::InvalidRequest {
            description: "code is required",
        });
    };
    let Some(code_verifier) = body.code_verifier.as_deref() else {
        return Err(TokenError::InvalidRequest {
            description: "code_verifier is required",
        });
    };
    let Some(redirect_uri) = body.redirect_uri.as_deref() else {
        return Err(TokenError::InvalidRequest {
            description: "redirect_uri is required",
        });
    };
    let redirect_uri = Url::parse(redirect_uri).map_err(|_| TokenError::InvalidRequest {
        description: "redirect_uri is not a valid url",
    })?;

    let entry = store
        .take_code(code)
        .await?
        .ok_or(TokenError::InvalidGrant {
            description: "authorization code is invalid, expired or already redeemed",
        })?;

    if !pkce::verify_s256(code_verifier, &entry.client_pkce_challenge) {
        tracing::warn!(
            code = token_fragment(&entry.code),
            "PKCE verification failed"
        );
        return Err(TokenError::InvalidGrant {
            description: "code_verifier does not match the code_challenge",
        });
    }
    if redirect_uri != entry.client_redirect_uri {
        return Err(TokenError::InvalidGrant {
            description: "redirect_uri does not match the authorization request",
        });
    }
    if let (Some(expected), Some(got)) = (&entry.client_id, &body.client_id) {
        if expected != got {
            return Err(TokenError::InvalidGrant {
                description: "client_id does not match the authorization request",
            });
        }
    }

    tracing::info!(
        code = token_fragment(&entry.code),
        "Authorization code redeemed"
    );
    Ok(Json(entry.idp_tokens))
}

/// Refreshes are not brokered, the stored grant ended with redemption.
/// The request goes straight upstream under the proxy's credentials.
async fn forward_refresh(
    client: &reqwest::Client,
    authn: &Authn,
    body: &Body,
) -> Result<Json<serde_json::Value>, TokenError> {
    let Some(refresh_token) = body.refresh_token.as_deref() else {
        return Err(TokenError::InvalidRequest {
            description: "refresh_token is required",
        });
    };
    let refresh_token = RefreshToken::new(refresh_token.to_string());

    let oauth_client = authn.create_oauth_client();
    let token_response = oauth_client
        .exchange_refresh_token(&refresh_token)
        .map_err(keybridge_core::Error::from)?
        .request_async(client)
        .await
        .map_err(|err| match err {
            RequestTokenError::ServerResponse(response) => TokenError::Rejected(response),
            err => {
                tracing::error!(error = ?err, "Refresh exchange failed");
                TokenError::UpstreamFailure
            }
        })?;

    let tokens = serde_json::to_value(&token_response).map_err(keybridge_core::Error::from)?;
    Ok(Json(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_grant_renders_rfc6749_json() {
        let response = TokenError::InvalidGrant {
            description: "authorization code is invalid, expired or already redeemed",
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_grant");
        assert!(body["error_description"].is_string());
    }

    #[tokio::test]
    async fn unsupported_grant_type_names_the_grant() {
        let response = TokenError::UnsupportedGrantType {
            grant_type: "password".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "unsupported_grant_type");
    }
}
