//! One-shot expiry sweep.

use crate::output;
use breakglass_core::error::AppError;

/// Close every impersonation past its deadline, then exit
pub async fn execute(env: &str) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let pool = super::create_db_pool(&config).await?;
    let service = super::create_service(&config, &pool);

    let expired = service.expire_sessions().await?;
    output::print_success(&format!("Expired {expired} impersonation(s)"));

    pool.close().await;
    Ok(())
}
