use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use axum::Router;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliOverrides, DatabaseConfig};
use students::config::StudentsConfig;
use students::infra::storage::StoreOptions;
use students::StudentsModule;
use tokio_util::sync::CancellationToken;
use url::Url;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
        }
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Students Server - CRUD over student records backed by SQLite
#[derive(Parser)]
#[command(name = "students-server")]
#[command(about = "Students Server - CRUD over student records backed by SQLite")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliOverrides {
        port: cli.port,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Defaults, then the YAML file, then APP__* env; home_dir comes back absolute
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    runtime::logging::init_logging(&config.logging, Path::new(&config.server.home_dir));
    tracing::info!("Students Server starting");

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Execute command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config).await,
    }
}

/// Only SQLite is supported; reject anything else up front with a readable error.
fn ensure_sqlite_dsn(cfg: &DatabaseConfig) -> Result<()> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;
    match url.scheme() {
        "sqlite" => Ok(()),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Resolve everything the store needs: absolute DSN, pool size, busy timeout.
fn store_options(config: &AppConfig, create_dirs: bool) -> Result<StoreOptions> {
    let db_config = &config.database;
    ensure_sqlite_dsn(db_config)?;

    // Base dir for resolving relative sqlite paths (already absolute & created)
    let base_dir = PathBuf::from(&config.server.home_dir);
    let url = absolutize_sqlite_dsn(db_config.url.trim(), &base_dir, create_dirs)?;

    Ok(StoreOptions {
        max_conns: db_config.max_conns,
        busy_timeout: (db_config.busy_timeout_ms > 0)
            .then(|| Duration::from_millis(u64::from(db_config.busy_timeout_ms))),
        ..StoreOptions::new(url)
    })
}

fn ingress_config(config: &AppConfig, args: &CliOverrides) -> Result<ApiIngressConfig> {
    let mut ingress: ApiIngressConfig = config.module_config("api_ingress")?;

    // An explicit --port/PORT always wins over a configured bind_addr.
    if ingress.bind_addr.trim().is_empty() || args.port.is_some() {
        ingress.bind_addr = config.bind_addr();
    }
    if config.server.timeout_sec > 0 {
        ingress.request_timeout_sec = config.server.timeout_sec;
    }
    Ok(ingress)
}

async fn run_server(config: AppConfig, args: CliOverrides) -> Result<()> {
    tracing::info!("Initializing modules...");

    let students_cfg: StudentsConfig = config.module_config("students")?;
    let ingress_cfg = ingress_config(&config, &args)?;
    let store = store_options(&config, true)?;

    tracing::info!("Using database: {}", store.url);
    let students = StudentsModule::init(students_cfg, store).await?;

    let ingress = ApiIngress::new(ingress_cfg);
    let router = ingress.build_router(students.register_rest(Router::new()));

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match runtime::shutdown::wait_for_shutdown().await {
            Ok(()) => signal_cancel.cancel(),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });

    ingress.serve(router, cancel).await?;
    tracing::info!("Students Server stopped");
    Ok(())
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    // AppConfig::load_* already normalized & created home_dir
    let _: StudentsConfig = config.module_config("students")?;
    let _: ApiIngressConfig = config.module_config("api_ingress")?;
    let store = store_options(&config, false)?;
    tracing::info!("Database DSN resolves to {}", store.url);

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}
