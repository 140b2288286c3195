pub mod oauth_authorization_server;
pub mod oauth_protected_resource;

use axum::{routing::get, Router};
use keybridge_core::Config;

pub fn router(config: &Config) -> Router<Config> {
    let mut router = Router::new()
        .route(
            "/oauth-authorization-server",
            get(oauth_authorization_server::handler),
        )
        .route(
            "/oauth-protected-resource",
            get(oauth_protected_resource::handler),
        );
    // clients derive the metadata path from the resource path (RFC 9728)
    if !config.mcp.path.is_empty() && config.mcp.path != "/" {
        router = router.route(
            &format!("/oauth-protected-resource{}", config.mcp.path),
            get(oauth_protected_resource::handler),
        );
    }
    router
}
