use tracing::{info, warn};

use crate::error::ProxyError;
use crate::models::Account;
use crate::source::StoreCreditSource;

/// Reject absent or blank emails before any upstream work.
pub fn require_email(email: Option<&str>) -> Result<&str, ProxyError> {
    email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ProxyError::validation("Email do customer é obrigatório"))
}

/// Map an email to the platform account. Not found (404) and upstream
/// failure (500) stay distinct.
pub async fn resolve_customer(
    source: &dyn StoreCreditSource,
    email: &str,
    context: &'static str,
) -> Result<Account, ProxyError> {
    match source.find_customer_by_email(email).await {
        Ok(Some(account)) => {
            info!("Resolved customer {} for {}", account.id, email);
            Ok(account)
        }
        Ok(None) => {
            warn!("No customer for {}", email);
            Err(ProxyError::NotFound)
        }
        Err(e) => Err(ProxyError::upstream(context)(e)),
    }
}
