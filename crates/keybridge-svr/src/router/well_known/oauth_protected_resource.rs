use axum::{extract::State, Json};
use keybridge_core::{Config, Error};
use serde::Serialize;

use crate::middlewares::RequestOrigin;

#[derive(Debug, Serialize)]
pub struct Response {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
}

/// RFC 9728 document pointing the client back at this proxy as the
/// authorization server for the MCP resource.
pub(crate) async fn handler(
    origin: RequestOrigin,
    State(config): State<Config>,
) -> Result<Json<Response>, Error> {
    let resource = origin.join(&config.mcp.path)?;

    Ok(Json(Response {
        resource: resource.to_string(),
        authorization_servers: vec![origin.origin_str().to_string()],
        scopes_supported: config.idp.scopes.clone(),
        bearer_methods_supported: vec!["header".to_string()],
    }))
}
