use std::time::Duration;

use axum::{
    routing::{any, get, post},
    Router,
};
use keybridge_auth::Authn;
use keybridge_core::{Config, Error};
use keybridge_store::FlowStore;
use tower_http::cors::CorsLayer;

use crate::middlewares::{
    trace_layer, AuthLayer, FlowStoreLayer, OriginRewriteLayer, ReqwestLayer,
};

pub mod meta;
pub mod well_known;

pub mod authorize;
pub mod callback;
pub mod mcp;
pub mod register;
pub mod token;

/// Where the IdP sends the user back. Registered with the IdP once,
/// served under whatever public origin the request arrived on.
pub(crate) const CALLBACK_PATH: &str = "/callback";

pub async fn router(config: Config) -> Result<Router, Error> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(3))
        .timeout(Duration::from_secs(30))
        .build()?;
    let authn = Authn::new(&config, &client).await?;
    let store = FlowStore::memory();

    let router = Router::new()
        .route("/authorize", get(authorize::handler))
        .route(CALLBACK_PATH, get(callback::handler))
        .route("/token", post(token::handler))
        .route("/register", post(register::handler))
        .route(&config.mcp.path, any(mcp::handler))
        .nest("/.well-known", well_known::router(&config))
        .nest("/.meta", meta::router(&config))
        .layer(OriginRewriteLayer::new(&config))
        .layer(ReqwestLayer::new(client))
        .layer(AuthLayer::new(authn))
        .layer(FlowStoreLayer::new(store))
        .layer(trace_layer())
        .layer(CorsLayer::permissive())
        .with_state(config);
    Ok(router)
}
