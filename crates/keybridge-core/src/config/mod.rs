pub mod application;
pub mod flow;
pub mod idp;
pub mod mcp;
pub mod server;

use serde::{Deserialize, Serialize};

pub use application::ApplicationConfig;
pub use flow::FlowConfig;
pub use idp::{IdpConfig, VerifierConfig};
pub use mcp::McpConfig;
pub use server::ServerConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub application: ApplicationConfig,
    pub server: ServerConfig,
    pub idp: IdpConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    pub mcp: McpConfig,
}
