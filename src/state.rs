use crate::audit::{AuditEvent, AuditStore};
use crate::config::Config;
use crate::services::aging::AgingSchedule;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub audit: Arc<dyn AuditStore>,
    pub aging: Arc<AgingSchedule>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        audit: Arc<dyn AuditStore>,
        aging: AgingSchedule,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            audit,
            aging: Arc::new(aging),
        }
    }

    /// Audit failures are logged, never surfaced to the caller.
    pub async fn record_audit(&self, event: AuditEvent) {
        let action = event.action;
        if let Err(e) = self.audit.record(event).await {
            warn!("Audit write failed for action '{}': {}", action, e);
        }
    }
}
