use anyhow::Context;
use clap::Parser;
use praxis_config::PraxisConfig;
use praxis_db::repos::user::NewUser;
use praxis_db::service::PraxisService;
use praxis_server::router::build_router;
use praxis_server::state::AppState;

mod cli;

use cli::{Cli, Commands, UserCommands};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("praxis error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PraxisConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PraxisConfig::load_with_dotenv().context("failed to load config")?,
    };
    init_tracing(cli.quiet, cli.verbose, config.general.log_json)?;

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Migrate => migrate(&config).await,
        Commands::User {
            action:
                UserCommands::Create {
                    email,
                    name,
                    password,
                    slug,
                },
        } => create_user(&config, email, name, &password, slug).await,
    }
}

async fn open(config: &PraxisConfig) -> anyhow::Result<PraxisService> {
    PraxisService::new_local(&config.database.path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database.path))
}

async fn serve(mut config: PraxisConfig, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    let service = open(&config).await?;

    let purged = service.purge_expired_sessions(chrono::Utc::now()).await?;
    if purged > 0 {
        tracing::info!(purged, "removed expired sessions");
    }
    if !config.mail.is_configured() {
        tracing::warn!("mail is not configured; lead notifications and password resets are skipped");
    }

    let addr = config.server.bind.clone();
    let state = AppState::new(service, config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "praxis listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("praxis stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
}

async fn migrate(config: &PraxisConfig) -> anyhow::Result<()> {
    open(config).await?;
    println!("database ready at {}", config.database.path);
    Ok(())
}

async fn create_user(
    config: &PraxisConfig,
    email: String,
    name: String,
    password: &str,
    slug: Option<String>,
) -> anyhow::Result<()> {
    praxis_auth::password::validate_password(password)?;
    let password_hash = praxis_auth::password::hash_password(password)?;

    let service = open(config).await?;
    let user = service
        .create_user(&NewUser {
            email,
            name,
            slug,
            password_hash,
            specialty: None,
            phone: None,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool, json: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("PRAXIS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}
