// src/audit.rs
//
// Audit trail for sensitive operations (logins, rate-schedule edits, SEPA
// batch generation). The storage engine is injected behind a trait; nothing
// in the codebase touches ambient storage directly.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug)]
pub struct AuditEvent {
    pub company_id: Uuid,
    pub actor: String,
    pub action: &'static str,
    pub detail: serde_json::Value,
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), sqlx::Error>;
}

pub struct PgAuditStore {
    db: PgPool,
}

impl PgAuditStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn record(&self, event: AuditEvent) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO audit_events (id, company_id, actor, action, detail, recorded_at)
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(event.company_id)
        .bind(&event.actor)
        .bind(event.action)
        .bind(&event.detail)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
