//! Impersonation audit trail CLI commands.

use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use super::ScopeArgs;
use crate::output::{self, OutputFormat};
use breakglass_core::error::AppError;
use breakglass_core::types::pagination::MAX_PAGE_SIZE;
use breakglass_core::types::{ImpersonationId, PageRequest};
use breakglass_entity::audit::{AuditEvent, AuditEventType, AuditFilter};

/// Arguments for audit commands
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Audit subcommand
    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands
#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Search the trail
    Search {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Only events of one impersonation
        #[arg(long)]
        impersonation: Option<ImpersonationId>,
        /// Only events of one type (started, ended, expired, action_performed)
        #[arg(long = "type")]
        event_type: Option<AuditEventType>,
        /// Days of history to search
        #[arg(short, long, default_value = "7")]
        days: i64,
        /// Number of results
        #[arg(short, long, default_value = "50")]
        limit: u64,
    },
    /// Summarise impersonation activity
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Days of history to cover
        #[arg(short, long, default_value = "30")]
        days: i64,
    },
    /// Export the trail to a JSON file
    Export {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Output file path
        #[arg(short, long, default_value = "impersonation_audit.json")]
        output: String,
        /// Days of history to export
        #[arg(short, long, default_value = "30")]
        days: i64,
    },
}

/// Audit display row
#[derive(Debug, Serialize, Tabled)]
struct AuditRow {
    /// Time
    time: String,
    /// Impersonation
    impersonation: String,
    /// Event
    event: String,
    /// Action
    action: String,
    /// Resource
    resource: String,
    /// IP
    ip: String,
}

impl From<&AuditEvent> for AuditRow {
    fn from(e: &AuditEvent) -> Self {
        Self {
            time: output::timestamp(e.created_at),
            impersonation: output::short_id(e.impersonation_id),
            event: e.event_type.to_string(),
            action: e.action.clone().unwrap_or_default(),
            resource: e.resource.clone().unwrap_or_default(),
            ip: e.ip_address.clone().unwrap_or_default(),
        }
    }
}

fn window(days: i64) -> Result<AuditFilter, AppError> {
    if days <= 0 {
        return Err(AppError::validation("--days must be positive"));
    }
    let to = Utc::now();
    Ok(AuditFilter {
        from: Some(to - Duration::days(days)),
        to: Some(to),
        ..AuditFilter::default()
    })
}

/// Execute audit commands
pub async fn execute(args: &AuditArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let pool = super::create_db_pool(&config).await?;
    let service = super::create_service(&config, &pool);
    let trail = service.audit();

    match &args.command {
        AuditCommand::Search {
            scope,
            impersonation,
            event_type,
            days,
            limit,
        } => {
            let filter = AuditFilter {
                impersonation_id: *impersonation,
                event_type: *event_type,
                ..window(*days)?
            };
            let page = trail
                .search(&scope.scope(), &filter, PageRequest::new(1, *limit))
                .await?;

            match format {
                OutputFormat::Json => output::print_record(&page.items, format),
                OutputFormat::Table => {
                    let rows: Vec<AuditRow> = page.items.iter().map(AuditRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        AuditCommand::Report { scope, days } => {
            let filter = window(*days)?;
            let (Some(from), Some(to)) = (filter.from, filter.to) else {
                return Err(AppError::internal("Report window is unset"));
            };
            let report = trail.compliance_report(&scope.scope(), from, to).await?;

            match format {
                OutputFormat::Json => output::print_record(&report, format),
                OutputFormat::Table => {
                    println!("Impersonation activity for {}", report.scope);
                    output::print_kv("From", &report.period_start.to_rfc3339());
                    output::print_kv("To", &report.period_end.to_rfc3339());
                    output::print_kv("Started", &report.started.to_string());
                    output::print_kv("Ended", &report.ended.to_string());
                    output::print_kv("Expired", &report.expired.to_string());
                    output::print_kv("Actions", &report.actions_performed.to_string());
                }
            }
        }
        AuditCommand::Export {
            scope,
            output: out_path,
            days,
        } => {
            let filter = window(*days)?;
            let scope = scope.scope();
            let mut events = Vec::new();
            let mut page_no = 1;
            loop {
                let page = trail
                    .search(&scope, &filter, PageRequest::new(page_no, MAX_PAGE_SIZE))
                    .await?;
                events.extend(page.items);
                if !page.has_next {
                    break;
                }
                page_no += 1;
            }

            let json = serde_json::to_string_pretty(&events)?;
            tokio::fs::write(out_path, json)
                .await
                .map_err(|e| AppError::internal(format!("Failed to write {out_path}: {e}")))?;

            output::print_success(&format!(
                "Exported {} audit events to {}",
                events.len(),
                out_path
            ));
        }
    }

    pool.close().await;
    Ok(())
}
