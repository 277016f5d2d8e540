//! CLI command definitions and dispatch.

pub mod audit;
pub mod migrate;
pub mod sessions;
pub mod sweep;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;
use breakglass_core::config::AppConfig;
use breakglass_core::error::AppError;
use breakglass_core::types::{AppId, EnvironmentId, OrganizationId, TenantScope};
use breakglass_database::DatabasePool;
use breakglass_service::ImpersonationService;

/// Breakglass: audited, time-boxed user impersonation
#[derive(Debug, Parser)]
#[command(name = "breakglass", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load from `config/<env>.toml`
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Inspect and end impersonations
    Sessions(sessions::SessionsArgs),
    /// Close impersonations past their deadline once
    Sweep,
    /// Query the impersonation audit trail
    Audit(audit::AuditArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.env).await,
            Commands::Sessions(args) => sessions::execute(args, &self.env, self.format).await,
            Commands::Sweep => sweep::execute(&self.env).await,
            Commands::Audit(args) => audit::execute(args, &self.env, self.format).await,
        }
    }
}

/// Tenant selection shared by scoped commands
#[derive(Debug, Clone, Args)]
pub struct ScopeArgs {
    /// Application ID
    #[arg(long = "app")]
    pub app_id: AppId,
    /// Environment ID within the application
    #[arg(long = "environment")]
    pub environment_id: Option<EnvironmentId>,
    /// Organization ID within the application
    #[arg(long = "organization")]
    pub organization_id: Option<OrganizationId>,
}

impl ScopeArgs {
    /// The selected tenant scope.
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            app_id: self.app_id,
            environment_id: self.environment_id,
            organization_id: self.organization_id,
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: wire the impersonation service against PostgreSQL
pub fn create_service(config: &AppConfig, pool: &DatabasePool) -> ImpersonationService {
    ImpersonationService::postgres(config, pool)
}

/// Helper: ask for confirmation unless `force` is set
pub fn confirm(prompt: &str, force: bool) -> Result<bool, AppError> {
    if force {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
