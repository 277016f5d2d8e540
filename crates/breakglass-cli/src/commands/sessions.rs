//! Impersonation session CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use super::ScopeArgs;
use crate::output::{self, OutputFormat};
use breakglass_core::error::AppError;
use breakglass_core::types::{ImpersonationId, PageRequest, UserId};
use breakglass_entity::impersonation::{ImpersonationSession, SessionFilter};
use breakglass_service::{EndRequest, ListRequest};

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionsCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List impersonations in a tenant, newest first
    List {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Only impersonations that are still usable
        #[arg(long)]
        active: bool,
        /// Filter by impersonator
        #[arg(long)]
        impersonator: Option<UserId>,
        /// Filter by target user
        #[arg(long)]
        target: Option<UserId>,
        /// Page number
        #[arg(long, default_value = "1")]
        page: u64,
        /// Page size
        #[arg(long, default_value = "25")]
        page_size: u64,
    },
    /// Show one impersonation
    Show {
        /// Impersonation ID
        id: ImpersonationId,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// End an impersonation on behalf of its impersonator
    End {
        /// Impersonation ID
        id: ImpersonationId,
        #[command(flatten)]
        scope: ScopeArgs,
        /// The impersonator who owns the impersonation
        #[arg(long)]
        impersonator: UserId,
        /// Reason recorded on the session
        #[arg(long)]
        reason: Option<String>,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Check whether an issued session is an impersonated view
    Verify {
        /// Issued session ID
        session_id: String,
    },
}

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Impersonation ID
    id: String,
    /// Impersonator
    impersonator: String,
    /// Target
    target: String,
    /// Status
    status: String,
    /// Started
    started: String,
    /// Expires
    expires: String,
    /// Reason
    reason: String,
}

impl SessionRow {
    fn from_session(s: &ImpersonationSession, now: chrono::DateTime<chrono::Utc>) -> Self {
        let status = if s.is_effectively_active(now) {
            "active".to_string()
        } else if s.active {
            "expired (pending sweep)".to_string()
        } else {
            s.end_reason.clone().unwrap_or_else(|| "ended".to_string())
        };
        Self {
            id: output::short_id(s.id),
            impersonator: output::short_id(s.impersonator_id),
            target: output::short_id(s.target_user_id),
            status,
            started: output::timestamp(s.created_at),
            expires: output::timestamp(s.expires_at),
            reason: s.reason.chars().take(40).collect(),
        }
    }
}

/// Execute session commands
pub async fn execute(
    args: &SessionsArgs,
    env: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let pool = super::create_db_pool(&config).await?;
    let service = super::create_service(&config, &pool);

    match &args.command {
        SessionsCommand::List {
            scope,
            active,
            impersonator,
            target,
            page,
            page_size,
        } => {
            let response = service
                .list(ListRequest {
                    scope: scope.scope(),
                    filter: SessionFilter {
                        active_only: *active,
                        impersonator_id: *impersonator,
                        target_user_id: *target,
                    },
                    page: PageRequest::new(*page, *page_size),
                })
                .await?;

            let now = chrono::Utc::now();
            match format {
                OutputFormat::Json => output::print_record(&response, format),
                OutputFormat::Table => {
                    let rows: Vec<SessionRow> = response
                        .items
                        .iter()
                        .map(|s| SessionRow::from_session(s, now))
                        .collect();
                    output::print_list(&rows, format);
                    output::print_page_footer(
                        response.page,
                        response.total_pages,
                        response.total_items,
                        format,
                    );
                }
            }
        }
        SessionsCommand::Show { id, scope } => {
            let session = service.get(&scope.scope(), *id).await?;
            output::print_record(&session, format);
        }
        SessionsCommand::End {
            id,
            scope,
            impersonator,
            reason,
            force,
        } => {
            if !super::confirm(&format!("End impersonation {id}?"), *force)? {
                println!("Cancelled.");
                return Ok(());
            }

            let ended = service
                .end(EndRequest {
                    scope: scope.scope(),
                    impersonation_id: *id,
                    impersonator_id: *impersonator,
                    reason: reason.clone(),
                })
                .await?;

            if ended.session_revoked {
                output::print_success(&format!("Impersonation {id} ended"));
            } else {
                output::print_warning(&format!(
                    "Impersonation {id} is ended but its session was not revoked by this call"
                ));
            }
            output::print_kv("Ended at", &ended.ended_at.to_rfc3339());
        }
        SessionsCommand::Verify { session_id } => {
            let verified = service.verify(session_id).await?;
            output::print_record(&verified, format);
        }
    }

    pool.close().await;
    Ok(())
}
