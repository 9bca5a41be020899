use std::env;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use log::{LevelFilter, debug, info, warn};
use tokio::net::TcpListener;

use roseanne::api::{self, AppState};
use roseanne::auth::{
    AuthConfig, AuthState, TokenAuthenticator, hash_password, hash_password_bcrypt,
};
use roseanne::celebrity::{MemoryCelebrityStore, PgCelebrityStore, SharedStore};
use roseanne::config::{self, APP_NAME, AppConfig};
use roseanne::db::{self, Database};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(ctx, cmd).await
}

#[tokio::main]
async fn async_init_db(ctx: RuntimeContext) -> Result<()> {
    handle_init_db(&ctx).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging();
    debug!("config file: {}", ctx.config_path.display());

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::InitDb => async_init_db(ctx),
        Command::HashPassword(cmd) => handle_hash_password(cmd),
        Command::GenerateSecret => handle_generate_secret(),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Roseanne - celebrity lookalike voting game server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Output machine readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create tables and upsert the seed celebrities
    InitDb,
    /// Produce an admin password verifier for ADMIN_PASSWORD_HASH
    HashPassword(HashPasswordCommand),
    /// Print a random signing secret for JWT_SECRET
    GenerateSecret,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,
    /// Allow the built-in development credentials and secret
    #[arg(long)]
    dev: bool,
    /// Use a seeded in-memory store instead of PostgreSQL
    #[arg(long)]
    memory: bool,
}

#[derive(Debug, Clone, Args)]
struct HashPasswordCommand {
    /// Password to hash
    password: String,
    /// Produce the legacy salted SHA-256 verifier instead of bcrypt
    #[arg(long)]
    legacy: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration with credentials masked
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    config_path: PathBuf,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let config_path = match &common.config {
            Some(path) => path
                .to_str()
                .map(config::expand_str_path)
                .transpose()?
                .unwrap_or_else(|| path.clone()),
            None => config::default_config_path()?,
        };
        let config = AppConfig::load(&config_path)?;

        Ok(Self {
            common,
            config_path,
            config,
        })
    }

    fn init_logging(&self) {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return;
        }

        let level = self.effective_log_level();
        let level_name = level.as_str().to_ascii_lowercase();

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{APP_NAME}={level_name},tower_http={level_name}"))
        });

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let disable_color = env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(!disable_color))
                .try_init()
                .ok();
        }

        // Also init env_logger for compatibility with log crate users
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.filter_level(level);
        builder.try_init().ok();
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.debug {
            return LevelFilter::Debug;
        }
        match self.common.verbose {
            0 => LevelFilter::from_str(&self.config.logging.level).unwrap_or(LevelFilter::Info),
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

async fn handle_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    let mut config = ctx.config;
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if cmd.dev {
        config.auth.dev_mode = true;
    }
    if config.auth.dev_mode {
        warn!("Development mode enabled, fallback credentials may be in use");
    }

    let authenticator = TokenAuthenticator::from_config(&config.auth)
        .context("invalid auth configuration")?;
    info!(
        "Admin authentication configured for '{}'",
        authenticator.admin_username()
    );

    let store: SharedStore = if cmd.memory {
        info!("Using seeded in-memory store");
        Arc::new(MemoryCelebrityStore::seeded().await?)
    } else {
        Arc::new(connect_store(&config).await?)
    };

    let state = AppState::new(
        AuthState::new(authenticator),
        store,
        config.maintenance.image_check_timeout(),
    );
    let app = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn connect_store(config: &AppConfig) -> Result<PgCelebrityStore> {
    let url = config.database.url.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
        anyhow!("no database URL configured; set POSTGRES_URL or database.url, or pass --memory")
    })?;
    info!("Connecting to {}", db::redact_url(url));
    let db = Database::connect(url, config.database.max_connections).await?;
    Ok(PgCelebrityStore::new(db))
}

async fn handle_init_db(ctx: &RuntimeContext) -> Result<()> {
    use roseanne::celebrity::CelebrityStore;

    let store = connect_store(&ctx.config).await?;
    store.initialize().await?;
    info!("Database initialized successfully");
    Ok(())
}

fn handle_hash_password(cmd: HashPasswordCommand) -> Result<()> {
    if cmd.password.is_empty() {
        bail!("password must not be empty");
    }
    let hash = if cmd.legacy {
        hash_password(&cmd.password)
    } else {
        hash_password_bcrypt(&cmd.password).context("hashing password")?
    };
    println!("{hash}");
    Ok(())
}

fn handle_generate_secret() -> Result<()> {
    println!("{}", AuthConfig::generate_jwt_secret());
    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let shown = ctx.config.redacted();
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&shown).context("serializing config to JSON")?
                );
            } else {
                println!("{}", shown.to_toml()?);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
        ConfigCommand::Init => {
            if ctx.config_path.exists() {
                info!("config already exists at {}", ctx.config_path.display());
                return Ok(());
            }
            config::write_default_config(&ctx.config_path)?;
            info!("wrote default config to {}", ctx.config_path.display());
            Ok(())
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}
