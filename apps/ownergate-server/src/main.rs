//! Ownergate server.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use authn_resolver::{IdentityResolver, JwtVerifier, PgPrincipalDirectory, TokenIssuer};
use clap::{Parser, Subcommand};
use documents::{DocumentsApi, DocumentsService, MIGRATOR, PgDocumentStore};
use ownergate_db::{PgSessionPool, SessionKeys, SessionPropagator};
use ownergate_security::Role;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(name = "ownergate-server", version, about = "Owner-scoped document service")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the REST API
    Run,
    /// Apply database migrations
    Migrate,
    /// Print a signed access token, for development
    IssueToken {
        #[arg(long)]
        subject: i64,
        #[arg(long, default_value = "standard")]
        role: Role,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
    },
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = ServerConfig::load(cli.config.as_deref())?;
    logging::init(&cfg.logging)?;

    match cli.command {
        Command::Run => run(cfg).await,
        Command::Migrate => migrate(&cfg).await,
        Command::IssueToken {
            subject,
            role,
            ttl_secs,
        } => issue_token(&cfg, subject, role, ttl_secs),
        Command::CheckConfig => check_config(&cfg),
    }
}

async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    let verifier = JwtVerifier::from_config(&cfg.authn).context("invalid authn configuration")?;
    let keys = SessionKeys::default();
    let pool = PgSessionPool::connect(&cfg.database, &keys)
        .await
        .context("failed to connect to the database")?;

    if cfg.documents.row_filtering_enabled() {
        let active = PgDocumentStore::row_filter_active(pool.inner())
            .await
            .context("failed to inspect row security")?;
        if !active {
            bail!(
                "row filtering is enabled but the documents policy does not apply to this \
                 database role; connect as a role that neither owns the table nor has BYPASSRLS"
            );
        }
    } else {
        tracing::warn!("row filtering disabled, the application check is the only enforcement layer");
    }

    let mut resolver = IdentityResolver::new(Arc::new(verifier));
    if cfg.authn.require_existing_principal {
        resolver = resolver.with_directory(Arc::new(PgPrincipalDirectory::new(pool.inner().clone())));
    }

    let service = DocumentsService::new(
        SessionPropagator::with_keys(Arc::new(pool), keys),
        Arc::new(PgDocumentStore::new()),
        cfg.documents,
    );
    let api: Arc<dyn DocumentsApi> = Arc::new(service);
    let app = documents::router(api, Arc::new(resolver)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "ownergate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn migrate(cfg: &ServerConfig) -> anyhow::Result<()> {
    let pool = PgPool::connect(cfg.database.url.expose_secret())
        .await
        .context("failed to connect to the database")?;
    MIGRATOR.run(&pool).await.context("migration failed")?;
    tracing::info!("migrations applied");
    Ok(())
}

fn issue_token(cfg: &ServerConfig, subject: i64, role: Role, ttl_secs: i64) -> anyhow::Result<()> {
    if subject <= 0 {
        bail!("subject must be a positive integer");
    }
    let issuer = TokenIssuer::from_config(&cfg.authn).context("invalid authn configuration")?;
    let token = issuer.issue(subject, role, chrono::Duration::seconds(ttl_secs))?;
    println!("{token}");
    Ok(())
}

fn check_config(cfg: &ServerConfig) -> anyhow::Result<()> {
    cfg.authn.validate().context("invalid authn configuration")?;
    tracing::info!(
        bind_addr = %cfg.bind_addr,
        algorithm = ?cfg.authn.algorithm,
        row_filtering = cfg.documents.row_filtering_enabled(),
        probe_on_deny = cfg.documents.probe_on_deny,
        max_conns = cfg.database.max_conns,
        "configuration is valid"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
