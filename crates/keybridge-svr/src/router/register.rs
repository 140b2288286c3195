use axum::Json;
use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct Body {
    redirect_uris: Vec<String>,
    #[serde(default)]
    token_endpoint_auth_method: Option<String>,
    #[serde(default)]
    grant_types: Vec<String>,
    #[serde(default)]
    response_types: Vec<String>,
    #[serde(default)]
    client_name: Option<String>,
    #[serde(default)]
    client_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    client_id: String,
    client_secret: String,
    redirect_uris: Vec<String>,
    client_id_issued_at: i64,
    client_secret_expires_at: i64,
}

/// Stateless registration. Nothing is persisted: the flow is secured by
/// the PKCE binding, the secret only exists for clients that refuse to
/// run without one.
pub async fn handler(Json(value): Json<Body>) -> Json<Response> {
    let raw_client_secret = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .collect::<Vec<_>>();
    let client_secret = String::from_utf8_lossy(&raw_client_secret).to_string();

    let now = Utc::now();
    let issued_at = now.timestamp();
    let expires_at = (now + Duration::hours(1)).timestamp();

    let client_id = Uuid::new_v4().to_string();
    tracing::info!(client_id = %client_id, "Registered client");

    Json(Response {
        client_id,
        client_secret,
        redirect_uris: value.redirect_uris,
        client_id_issued_at: issued_at,
        client_secret_expires_at: expires_at,
    })
}
