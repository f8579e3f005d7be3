mod events;

use {
    clap::Parser,
    std::sync::Arc,
    tokio::sync::{Mutex, mpsc},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    watchword_common::SystemClock,
    watchword_config::{BotSettings, JsonFileStore},
    watchword_extensions::{Dispatcher, ExtensionHost, ExtensionManager, ExtensionRegistry},
    watchword_keywords::Keywords,
    watchword_slack::{Directory, SlackGateway, WebGateway},
};

#[derive(Parser)]
#[command(name = "watchword", about = "Watchword — Slack keyword assistant")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides the default).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides the default).
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding persisted extension state.
    #[arg(long, env = "WATCHWORD_STATE_DIR")]
    state_dir: Option<std::path::PathBuf>,
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli);

    let mut settings = BotSettings::from_env()?;
    if let Some(bind) = &cli.bind {
        settings.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(state_dir) = &cli.state_dir {
        settings.state_dir = state_dir.clone();
    }

    let gateway: Arc<dyn SlackGateway> = Arc::new(WebGateway::new(
        settings.token(),
        settings.username.clone(),
        settings.icon_emoji.clone(),
    ));
    let bot_user_id = gateway.auth_test().await?;
    info!(%bot_user_id, "authenticated against the workspace");

    let directory = Arc::new(Directory::new(gateway.clone(), Arc::new(SystemClock)));
    let store = Arc::new(JsonFileStore::new(settings.state_dir.clone()));
    let host = ExtensionHost {
        gateway: gateway.clone(),
        directory,
        store,
    };

    let registry = Arc::new(Mutex::new(ExtensionRegistry::new()));
    {
        let mut guard = registry.lock().await;
        guard.register(
            watchword_extensions::manager::NAME,
            ExtensionManager::factory(registry.clone()),
        );
        guard.register(watchword_keywords::ext::NAME, Keywords::factory());
        guard.load_all(&host).await?;
        guard.enable_all()?;
    }
    info!("extensions registered, loaded, and enabled");

    let started_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    let dispatcher = Dispatcher::new(registry, bot_user_id, started_at);

    let (tx, rx) = mpsc::channel(256);
    let app = events::router(&settings.api_endpoint, tx);
    let addr = format!("{}:{}", settings.bind, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, endpoint = %settings.api_endpoint, "listening for events");

    tokio::spawn(async move { dispatcher.run(rx).await });
    axum::serve(listener, app).await?;
    Ok(())
}
