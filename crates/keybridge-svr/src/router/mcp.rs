use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
    Extension,
};
use http::{header, request::Parts, HeaderName, Method, StatusCode};
use keybridge_auth::Authn;
use keybridge_core::{Authentication, Config, GeneralAuthn};

use crate::utils::ReqwestResponse;

const MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");
const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// Bearer-guarded relay in front of the MCP server. Payloads are not
/// interpreted, only the authentication gate lives here.
pub async fn handler(
    State(config): State<Config>,
    Extension(authn): Extension<Authn>,
    Extension(client): Extension<reqwest::Client>,
    req: Request,
) -> Response {
    let (parts, body) = req.into_parts();
    match authn.authenticate(&parts).await {
        Ok(Authentication::Jwt { jwt }) => {
            tracing::debug!(
                sub = jwt.claims.get("sub").and_then(|sub| sub.as_str()).unwrap_or(""),
                "MCP request authenticated"
            );
        }
        Ok(Authentication::NoAuth) => return unauthorized(&config, None),
        Err(err) => {
            tracing::debug!(error = %err, "Bearer verification failed");
            return unauthorized(&config, Some("invalid_token"));
        }
    }
    forward(&config, &client, parts, body).await
}

async fn forward(
    config: &Config,
    client: &reqwest::Client,
    parts: Parts,
    body: Body,
) -> Response {
    let mut upstream = config.mcp.upstream.clone();
    upstream.set_query(parts.uri.query());

    let mut request = client.request(parts.method.clone(), upstream.clone());
    for name in [header::CONTENT_TYPE, header::ACCEPT, MCP_SESSION_ID, LAST_EVENT_ID] {
        for value in parts.headers.get_all(&name) {
            request = request.header(&name, value);
        }
    }
    let request = if parts.method == Method::GET
        || parts.method == Method::HEAD
        || parts.method == Method::DELETE
    {
        request
    } else {
        request.body(reqwest::Body::wrap_stream(body.into_data_stream()))
    };

    match request.send().await {
        Ok(response) => ReqwestResponse(response).into_response(),
        Err(err) => {
            tracing::error!(error = %err, upstream = %upstream, "MCP upstream request failed");
            Response::builder()
                .status(StatusCode::BAD_GATEWAY)
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Body::from("MCP upstream unavailable"))
                .unwrap()
        }
    }
}

/// RFC 9728 challenge. Written against the placeholder origin, the
/// rewrite layer points it at the origin the client actually used.
fn challenge(config: &Config, error: Option<&str>) -> String {
    let metadata = format!(
        "{}/.well-known/oauth-protected-resource{}",
        config.server.placeholder.as_str().trim_end_matches('/'),
        config.mcp.path
    );
    match error {
        Some(error) => format!("Bearer error=\"{error}\", resource_metadata=\"{metadata}\""),
        None => format!("Bearer resource_metadata=\"{metadata}\""),
    }
}

fn unauthorized(config: &Config, error: Option<&str>) -> Response {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-store")
        .header(header::WWW_AUTHENTICATE, challenge(config, error))
        .body(Body::from("Authentication required"))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keybridge_core::{
        ApplicationConfig, FlowConfig, IdpConfig, McpConfig, ServerConfig, VerifierConfig,
    };
    use redact::Secret;
    use url::Url;

    fn test_config() -> Config {
        Config {
            application: ApplicationConfig::default(),
            server: ServerConfig {
                addr: "127.0.0.1:9000".parse().unwrap(),
                placeholder: Url::parse("http://localhost:9000").unwrap(),
                internal_aliases: vec![],
            },
            idp: IdpConfig {
                issuer: Url::parse("http://keycloak.internal:8080/realms/mcp").unwrap(),
                public_issuer: None,
                client_id: "proxy-client".to_string(),
                client_secret: Secret::new(String::new()),
                scopes: vec!["openid".to_string()],
                upstream_pkce: true,
            },
            verifier: VerifierConfig::default(),
            flow: FlowConfig::default(),
            mcp: McpConfig {
                path: "/mcp".to_string(),
                upstream: Url::parse("http://localhost:3001/mcp").unwrap(),
            },
        }
    }

    #[test]
    fn challenge_points_at_the_resource_metadata() {
        assert_eq!(
            challenge(&test_config(), None),
            "Bearer resource_metadata=\"http://localhost:9000/.well-known/oauth-protected-resource/mcp\"",
        );
    }

    #[test]
    fn challenge_with_error_keeps_rfc6750_order() {
        assert_eq!(
            challenge(&test_config(), Some("invalid_token")),
            "Bearer error=\"invalid_token\", resource_metadata=\"http://localhost:9000/.well-known/oauth-protected-resource/mcp\"",
        );
    }

    #[test]
    fn unauthorized_responses_are_not_cacheable() {
        let response = unauthorized(&test_config(), None);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }
}
