use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::app::{app, AppState};
use crate::auth::{hash_password, Role};
use crate::config::{AppConfig, Environment};
use crate::database::models::NewStaffAccount;
use crate::database::{CredentialStore, DatabaseManager, MemoryStore, PgStore, RecordStore};

#[derive(Parser)]
#[command(name = "ward-api")]
#[command(about = "Ward API - hospital administration server with role-gated access and audit history")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Create tables, indexes and the audit append-only guard")]
    InitDb,

    #[command(about = "Provision a staff account; it must change its password on first login")]
    CreateAccount {
        #[arg(long, help = "Login name")]
        username: String,
        #[arg(long, help = "Display name carried in tokens")]
        name: String,
        #[arg(long, help = "ADMIN, DOCTOR, NURSE or RECEPTIONIST")]
        role: Role,
        #[arg(long, help = "Initial password")]
        password: String,
    },

    #[command(about = "Print a bcrypt hash for a password")]
    HashPassword {
        password: String,
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(load_config()?).await,
        Commands::InitDb => {
            let pool = connect(&load_config()?).await?;
            DatabaseManager::ensure_schema(&pool).await?;
            Ok(())
        }
        Commands::CreateAccount {
            username,
            name,
            role,
            password,
        } => {
            let config = load_config()?;
            let store = PgStore::new(connect(&config).await?);
            let account = store
                .create_account(NewStaffAccount {
                    username,
                    display_name: name,
                    role,
                    password_hash: hash_password(&password, config.security.password_hash_cost)?,
                })
                .await?;
            println!("Created {} account '{}' (id {})", account.role, account.username, account.id);
            Ok(())
        }
        Commands::HashPassword { password, cost } => {
            println!("{}", hash_password(&password, cost)?);
            Ok(())
        }
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting Ward API in {:?} mode", config.environment);
    Ok(config)
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    DatabaseManager::connect(&config.database)
        .await
        .context("cannot reach the database")
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    if config.uses_development_secret() {
        tracing::warn!("Using the built-in development signing key; set SECURITY_JWT_SECRET");
    }

    let (credentials, records) = stores(&config).await?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::build(config, credentials, records)?);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Ward API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

type Stores = (Arc<dyn CredentialStore>, Arc<dyn RecordStore>);

async fn stores(config: &AppConfig) -> anyhow::Result<Stores> {
    if config.database.url.is_some() {
        let pool = connect(config).await?;
        DatabaseManager::ensure_schema(&pool).await?;
        let store = PgStore::new(pool);
        let credentials: Arc<dyn CredentialStore> = Arc::new(store.clone());
        let records: Arc<dyn RecordStore> = Arc::new(store);
        return Ok((credentials, records));
    }

    if config.environment != Environment::Development {
        anyhow::bail!("DATABASE_URL must be set in {:?} mode", config.environment);
    }

    tracing::warn!("DATABASE_URL not set; using an in-memory store, nothing will persist");
    let store = MemoryStore::new();
    if let Ok(password) = std::env::var("DEV_ADMIN_PASSWORD") {
        let admin = store
            .create_account(NewStaffAccount {
                username: "admin".to_string(),
                display_name: "Development Admin".to_string(),
                role: Role::Admin,
                password_hash: hash_password(&password, config.security.password_hash_cost)?,
            })
            .await?;
        tracing::info!(subject_id = admin.id, "Seeded development admin account 'admin'");
    }
    let credentials: Arc<dyn CredentialStore> = Arc::new(store.clone());
    let records: Arc<dyn RecordStore> = Arc::new(store);
    Ok((credentials, records))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
