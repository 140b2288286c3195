use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub addr: SocketAddr,

    /// Origin handlers bake into absolute URLs. It never leaves the
    /// process: the egress rewrite swaps it for the origin the request
    /// actually arrived on.
    #[serde(default = "default_placeholder")]
    pub placeholder: Url,

    /// Further origins rewritten on egress, e.g. the cluster-internal
    /// spelling of the IdP.
    #[serde(default)]
    pub internal_aliases: Vec<Url>,
}

pub fn default_placeholder() -> Url {
    Url::parse("http://localhost:9000").expect("placeholder url")
}
