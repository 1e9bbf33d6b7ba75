pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod parser;
pub mod proxy;
pub mod settings;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, UserCommands};
pub use config::Config;
use db::Store;
use settings::{EnvSource, ProcessEnv, SeaOrmSettingsProvider, Settings, SettingsRegistry};

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Settings => cli::cmd_settings(&config).await,
        Commands::Users { command } => match command.unwrap_or(UserCommands::List) {
            UserCommands::List => cli::cmd_user_list(&config).await,
            UserCommands::SetRole { email, role } => {
                cli::cmd_user_set_role(&config, &email, &role).await
            }
        },
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let json = config.json_logs();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer));

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "llmos-dashboard")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

pub async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
    .with_context(|| format!("Failed to open database {}", config.general.database_path))
}

/// Registers the compiled defaults (with config overrides applied) and
/// reconciles them into `store`.
pub async fn init_settings(
    config: &Config,
    store: &Store,
    env: Arc<dyn EnvSource>,
) -> anyhow::Result<Arc<Settings>> {
    let registry = SettingsRegistry::with_defaults();
    for name in registry.apply_overrides(&config.settings.defaults) {
        warn!(setting = %name, "Ignoring default override for unknown setting");
    }

    let settings = Arc::new(Settings::new(Arc::new(registry), env));
    settings
        .attach(Arc::new(SeaOrmSettingsProvider::new(store.clone())))
        .await
        .context("Failed to reconcile settings")?;

    Ok(settings)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("LLMOS Dashboard v{} starting...", env!("CARGO_PKG_VERSION"));

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    let store = open_store(&config).await?;
    let settings = init_settings(&config, &store, Arc::new(ProcessEnv)).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = api::create_app_state(config, store, settings, prometheus_handle).await?;
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Error listening for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => warn!("Error listening for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
