use anyhow::{Context, Result};
use figment::{
    providers::{Format, Json as FigmentJson},
    Figment,
};
use keybridge_core::Config;
use keybridge_svr::router;
use serde_json::json;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::utils::clean_json;

use super::command::SubcommandRun;

pub async fn run(cli: &SubcommandRun) -> Result<()> {
    let configfile = cli.configfile.clone().map(FigmentJson::file);
    let config: Config = Figment::new()
        .merge(configfile.unwrap_or(FigmentJson::string("{}")))
        .merge(figment_merge(cli))
        .extract()
        .context("Failed to load configuration")?;

    let env_filter = config
        .application
        .log_filter
        .as_ref()
        .cloned()
        .unwrap_or("info".to_string())
        .parse::<EnvFilter>()
        .context("Failed to parse log filter")?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(env_filter)
        .init();
    tracing::info!("{}", serde_json::to_string_pretty(&config).unwrap());

    tracing::info!("Server started at: {}", config.server.addr);
    let listener = tokio::net::TcpListener::bind(config.server.addr).await?;
    let app = router::router(config).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down...");
}

fn figment_merge(cli: &SubcommandRun) -> figment::providers::Serialized<figment::value::Value> {
    let result = json!({
        "application": {
            "log_filter": cli.log_filter,
            "prometheus": cli.prometheus,
            "health_check": cli.health_check,
        },
        "server": {
            "addr": cli.addr,
            "placeholder": cli.placeholder,
            "internal_aliases": cli.internal_aliases,
        },
        "idp": {
            "issuer": cli.idp_issuer,
            "public_issuer": cli.idp_public_issuer,
            "client_id": cli.idp_client_id,
            "client_secret": cli.idp_client_secret,
            "scopes": cli.idp_scopes,
        },
        "mcp": {
            "path": cli.mcp_path,
            "upstream": cli.mcp_upstream,
        },
    });

    let figment_value: figment::value::Value = serde_json::from_value(clean_json(result)).unwrap();
    figment::providers::Serialized::from(figment_value, figment::Profile::Default)
}
