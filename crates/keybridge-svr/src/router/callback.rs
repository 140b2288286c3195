use std::borrow::Cow;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};
use chrono::{Duration, Utc};
use http::StatusCode;
use keybridge_auth::Authn;
use keybridge_core::{
    token_fragment, Config, GeneralAuthn, GeneralFlowStore, ProxyAuthorizationCode,
};
use keybridge_store::FlowStore;
use oauth2::{AuthorizationCode, PkceCodeVerifier, RedirectUrl};
use rand::{distr::Alphanumeric, Rng};
use serde::Deserialize;

use super::CALLBACK_PATH;
use crate::middlewares::RequestOrigin;

#[derive(Debug, Deserialize)]
pub struct Params {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("The identity provider reported: {error}. {description}")]
    Upstream { error: String, description: String },

    #[error("The callback carried neither a code nor an error")]
    MissingParameters,

    #[error("Invalid or expired authorization transaction")]
    UnknownTransaction,

    #[error("Token exchange with the identity provider failed")]
    ExchangeFailed,

    #[error(transparent)]
    Internal(#[from] keybridge_core::Error),
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = match &self {
            CallbackError::Upstream { .. } => StatusCode::BAD_REQUEST,
            CallbackError::MissingParameters => StatusCode::BAD_REQUEST,
            CallbackError::UnknownTransaction => StatusCode::BAD_REQUEST,
            CallbackError::ExchangeFailed => StatusCode::BAD_GATEWAY,
            CallbackError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_page(status, &self.to_string())
    }
}

// error_description comes straight from the IdP redirect.
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>Authorization failed</title></head>\n\
         <body>\n\
         <h1>Authorization failed</h1>\n\
         <p>{}</p>\n\
         <p>Close this window and start the sign-in again.</p>\n\
         </body>\n\
         </html>\n",
        escape_html(message)
    );
    (status, Html(body)).into_response()
}

/// Completes the upstream leg. The transaction is taken before anything
/// else touches the IdP, so a replayed `state` dies here no matter how
/// the first attempt ended.
pub async fn handler(
    origin: RequestOrigin,
    State(config): State<Config>,
    Extension(client): Extension<reqwest::Client>,
    Extension(authn): Extension<Authn>,
    Extension(store): Extension<FlowStore>,
    Query(query): Query<Params>,
) -> Result<impl IntoResponse, CallbackError> {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(error = %error, "Identity provider rejected the authorization");
        return Err(CallbackError::Upstream { error, description });
    }
    let (Some(code), Some(state)) = (query.code, query.state) else {
        return Err(CallbackError::MissingParameters);
    };

    let txn = store
        .take_transaction(&state)
        .await?
        .ok_or(CallbackError::UnknownTransaction)?;
    tracing::info!(
        txn_id = token_fragment(&txn.txn_id),
        "Callback claimed transaction"
    );

    // Byte-for-byte the redirect_uri the IdP saw, rebuilt from the origin
    // this request actually arrived on.
    let redirect_url = RedirectUrl::from_url(
        origin
            .join(CALLBACK_PATH)
            .map_err(keybridge_core::Error::from)?,
    );
    let oauth_client = authn.create_oauth_client();
    let mut token_request = oauth_client
        .exchange_code(AuthorizationCode::new(code))
        .map_err(keybridge_core::Error::from)?
        .set_redirect_uri(Cow::Borrowed(&redirect_url));
    if let Some(verifier) = txn.upstream_pkce_verifier.clone() {
        token_request = token_request.set_pkce_verifier(PkceCodeVerifier::new(verifier));
    }
    let token_response = token_request.request_async(&client).await.map_err(|err| {
        tracing::error!(
            error = ?err,
            txn_id = token_fragment(&txn.txn_id),
            "Code exchange with the identity provider failed"
        );
        CallbackError::ExchangeFailed
    })?;
    let idp_tokens = serde_json::to_value(&token_response).map_err(keybridge_core::Error::from)?;

    let code = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect::<String>();
    let now = Utc::now();
    let proxy_code = ProxyAuthorizationCode {
        code: code.clone(),
        client_redirect_uri: txn.client_redirect_uri.clone(),
        client_pkce_challenge: txn.client_pkce_challenge.clone(),
        client_id: txn.client_id.clone(),
        idp_tokens,
        created_at: now,
        expires_at: now + Duration::seconds(config.flow.code_ttl as i64),
    };
    tracing::info!(
        txn_id = token_fragment(&txn.txn_id),
        code = token_fragment(&proxy_code.code),
        "Issued authorization code"
    );
    store.insert_code(proxy_code).await?;

    let mut redirect = txn.client_redirect_uri.clone();
    redirect.query_pairs_mut().append_pair("code", &code);
    if let Some(client_state) = &txn.client_state {
        redirect.query_pairs_mut().append_pair("state", client_state);
    }
    Ok(Redirect::to(redirect.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escaping_neutralizes_markup() {
        assert_eq!(
            escape_html("<script>alert('&')</script>"),
            "&lt;script&gt;alert(&#39;&amp;&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn error_pages_carry_the_message() {
        let response = error_page(StatusCode::BAD_REQUEST, "no such transaction");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
