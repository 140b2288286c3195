use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    Extension,
};
use chrono::{Duration, Utc};
use keybridge_auth::Authn;
use keybridge_core::{
    token_fragment, Config, Error, Error400, GeneralAuthn, GeneralFlowStore, Transaction,
};
use keybridge_store::FlowStore;
use oauth2::{CsrfToken, PkceCodeChallenge, RedirectUrl};
use serde::Deserialize;
use url::Url;

use super::CALLBACK_PATH;

#[derive(Debug, Deserialize)]
pub struct Params {
    response_type: String,
    client_id: String,
    redirect_uri: String,
    state: Option<String>,
    code_challenge: String,
    code_challenge_method: String,
    scope: Option<String>,
}

/// Starts a brokered authorization. The client's PKCE challenge stays
/// here, pinned to the transaction; the IdP sees the proxy's own
/// challenge and the transaction id as `state`.
pub async fn handler(
    State(config): State<Config>,
    Extension(authenticater): Extension<Authn>,
    Extension(store): Extension<FlowStore>,
    Query(query): Query<Params>,
) -> Result<impl IntoResponse, Error> {
    if query.response_type != "code" {
        return Err(Error400::UnsupportedResponseType(query.response_type).into());
    }
    if query.code_challenge_method != "S256" {
        return Err(Error400::UnsupportedChallengeMethod(query.code_challenge_method).into());
    }
    if query.code_challenge.is_empty() {
        return Err(Error400::MissingParameter("code_challenge").into());
    }
    let client_redirect_uri = Url::parse(&query.redirect_uri).map_err(Error400::InvalidUrl)?;

    // The rewrite layer turns the placeholder into the live origin on the
    // way out, so the IdP receives the same redirect_uri the callback
    // will later claim.
    let upstream_redirect = RedirectUrl::from_url(config.server.placeholder.join(CALLBACK_PATH)?);

    let txn_id = CsrfToken::new_random();
    let (upstream_challenge, upstream_verifier) = if config.idp.upstream_pkce {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        (Some(challenge), Some(verifier))
    } else {
        (None, None)
    };

    let scopes = query
        .scope
        .as_deref()
        .map(|scope| scope.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let now = Utc::now();
    let txn = Transaction {
        txn_id: txn_id.secret().clone(),
        client_redirect_uri,
        client_state: query.state,
        client_pkce_challenge: query.code_challenge,
        client_id: Some(query.client_id),
        scopes,
        upstream_pkce_verifier: upstream_verifier
            .as_ref()
            .map(|verifier| verifier.secret().clone()),
        created_at: now,
        expires_at: now + Duration::seconds(config.flow.transaction_ttl as i64),
    };
    tracing::info!(
        txn_id = token_fragment(&txn.txn_id),
        "Authorization transaction created"
    );
    store.insert_transaction(txn).await?;

    let client = authenticater
        .create_oauth_client()
        .set_redirect_uri(upstream_redirect);
    let mut request = client
        .authorize_url(move || txn_id)
        .add_scopes(authenticater.scopes());
    if let Some(challenge) = upstream_challenge {
        request = request.set_pkce_challenge(challenge);
    }
    let (auth_url, _state) = request.url();

    Ok(Redirect::to(auth_url.as_str()))
}
