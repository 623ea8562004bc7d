use anyhow::Result;
use clap::Parser;
use donation_etl::cli::{execute, Cli};
use donation_etl::load_config::load_config_or_default;
use donation_etl::logging::{bootstrap_dispatch, build_dispatch};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Config loading reports to stderr until the configured sinks exist.
    let config = tracing::dispatcher::with_default(&bootstrap_dispatch(), || {
        load_config_or_default(cli.config.clone())
    })?;

    // The runtime is single threaded, so a thread-scoped default subscriber
    // sees every event the pipeline emits.
    let (dispatch, _guard) = build_dispatch(&config.log)?;
    let _default = tracing::dispatcher::set_default(&dispatch);
    tracing::info!(
        config_path = ?cli.config,
        backend = config.storage.backend_name(),
        "CLI application startup: tracing initialised, config loaded"
    );

    let result = execute(cli.command, &config).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
