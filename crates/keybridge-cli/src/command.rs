use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub subcommand: Subcommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Subcommands {
    Run(SubcommandRun),
}

#[derive(Args, Debug, Clone)]
pub struct SubcommandRun {
    #[arg(short, long = "config", env = "KEYBRIDGE_CONFIG_FILE")]
    pub configfile: Option<PathBuf>,

    #[arg(
        short,
        long = "log-filter",
        env = "KEYBRIDGE_LOG_FILTER",
        default_value_t = String::from("warn")
    )]
    pub log_filter: String,

    #[arg(
        long = "prometheus",
        env = "KEYBRIDGE_PROMETHEUS",
        default_value_t = false
    )]
    pub prometheus: bool,

    #[arg(
        long = "health-check",
        env = "KEYBRIDGE_HEALTH_CHECK",
        default_value_t = true
    )]
    pub health_check: bool,

    #[arg(long = "addr", env = "KEYBRIDGE_SERVER_ADDR", default_value_t = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9000))]
    pub addr: SocketAddr,

    #[arg(long = "placeholder", env = "KEYBRIDGE_SERVER_PLACEHOLDER")]
    pub placeholder: Option<Url>,

    #[arg(long = "internal-alias", env = "KEYBRIDGE_SERVER_INTERNAL_ALIASES", value_delimiter = ',', num_args = 1..)]
    pub internal_aliases: Option<Vec<Url>>,

    #[arg(long = "idp-issuer", env = "KEYBRIDGE_IDP_ISSUER")]
    pub idp_issuer: Option<Url>,

    #[arg(long = "idp-public-issuer", env = "KEYBRIDGE_IDP_PUBLIC_ISSUER")]
    pub idp_public_issuer: Option<Url>,

    #[arg(long = "idp-client-id", env = "KEYBRIDGE_IDP_CLIENT_ID")]
    pub idp_client_id: Option<String>,

    #[arg(long = "idp-client-secret", env = "KEYBRIDGE_IDP_CLIENT_SECRET")]
    pub idp_client_secret: Option<String>,

    #[arg(long = "idp-scopes", env = "KEYBRIDGE_IDP_SCOPES", value_delimiter = ',', num_args = 1..)]
    pub idp_scopes: Option<Vec<String>>,

    #[arg(long = "mcp-path", env = "KEYBRIDGE_MCP_PATH")]
    pub mcp_path: Option<String>,

    #[arg(long = "mcp-upstream", env = "KEYBRIDGE_MCP_UPSTREAM")]
    pub mcp_upstream: Option<Url>,
}
