// src/handlers/report.rs

use crate::{
    auth::AuthCompany,
    errors::AppResult,
    models::AgingReport,
    services::aging::{self, ItemSide, OpenItem},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct AgingQuery {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct OpenItemRow {
    due_date: Option<NaiveDate>,
    total: Decimal,
    paid: Decimal,
}

/// Receivables/payables aging report over the configured bucket schedule
#[utoipa::path(
    get,
    path = "/api/v1/reports/aging",
    params(("as_of" = Option<String>, Query, description = "Reference date (YYYY-MM-DD), defaults to today")),
    responses((status = 200, description = "Aging report", body = AgingReport)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn aging_report(
    auth: AuthCompany,
    State(state): State<AppState>,
    Query(query): Query<AgingQuery>,
) -> AppResult<Json<AgingReport>> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let receivables = sqlx::query_as::<_, OpenItemRow>(
        "SELECT due_date, total, paid FROM customer_invoices
         WHERE company_id = $1 AND paid < total",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    let payables = sqlx::query_as::<_, OpenItemRow>(
        "SELECT due_date, total, paid FROM supplier_invoices
         WHERE company_id = $1 AND paid < total",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    let items: Vec<OpenItem> = receivables
        .into_iter()
        .map(|row| open_item(row, ItemSide::Receivable))
        .chain(
            payables
                .into_iter()
                .map(|row| open_item(row, ItemSide::Payable)),
        )
        .collect();

    let buckets = aging::bucketize(&items, as_of, &state.aging);
    let total_receivables: Decimal = buckets.iter().map(|b| b.receivables).sum();
    let total_payables: Decimal = buckets.iter().map(|b| b.payables).sum();

    Ok(Json(AgingReport {
        as_of,
        buckets,
        total_receivables,
        total_payables,
    }))
}

fn open_item(row: OpenItemRow, side: ItemSide) -> OpenItem {
    OpenItem {
        due_date: row.due_date,
        total: row.total,
        paid: row.paid,
        side,
    }
}
