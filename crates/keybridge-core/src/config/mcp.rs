use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpConfig {
    /// Route the protected MCP surface is served under.
    #[serde(default = "default_path")]
    pub path: String,

    /// MCP server requests are relayed to once the bearer token checks out.
    pub upstream: Url,
}

fn default_path() -> String {
    "/mcp".to_string()
}
