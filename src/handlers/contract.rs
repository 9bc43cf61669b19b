// src/handlers/contract.rs

use crate::{
    audit::AuditEvent,
    auth::AuthCompany,
    errors::{AppError, AppResult},
    models::{
        BracketInput, Contract, ContractBracket, ContractDetail, CreateContractRequest,
        ProjectedRevenue, RebateReport, RebateResult, RevenueSnapshot, SetRateScheduleRequest,
    },
    services::{projection, rebate},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

fn to_rate_brackets(inputs: &[BracketInput]) -> Vec<rebate::RateBracket> {
    inputs
        .iter()
        .map(|b| rebate::RateBracket {
            threshold: b.threshold,
            rate: b.rate,
        })
        .collect()
}

async fn insert_brackets(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    contract_id: Uuid,
    company_id: Uuid,
    brackets: &[BracketInput],
) -> AppResult<()> {
    for (position, bracket) in brackets.iter().enumerate() {
        sqlx::query(
            "INSERT INTO contract_brackets (id, contract_id, company_id, threshold, rate, position)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(contract_id)
        .bind(company_id)
        .bind(bracket.threshold)
        .bind(bracket.rate)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn fetch_brackets(state: &AppState, contract_id: Uuid) -> AppResult<Vec<ContractBracket>> {
    let brackets = sqlx::query_as::<_, ContractBracket>(
        "SELECT id, contract_id, threshold, rate, position
         FROM contract_brackets WHERE contract_id = $1 ORDER BY position",
    )
    .bind(contract_id)
    .fetch_all(&state.db)
    .await?;
    Ok(brackets)
}

async fn fetch_contract(state: &AppState, contract_id: Uuid, company_id: Uuid) -> AppResult<Contract> {
    sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1 AND company_id = $2")
        .bind(contract_id)
        .bind(company_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", contract_id)))
}

/// Create a contract with its progressive rebate rate schedule
#[utoipa::path(
    post,
    path = "/api/v1/contracts",
    request_body = CreateContractRequest,
    responses(
        (status = 201, description = "Contract created", body = ContractDetail),
        (status = 400, description = "Invalid dates or rate schedule"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Contracts"
)]
pub async fn create_contract(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateContractRequest>,
) -> AppResult<(StatusCode, Json<ContractDetail>)> {
    if body.end_date <= body.start_date {
        return Err(AppError::Validation(
            "Contract end date must be after the start date".to_string(),
        ));
    }
    rebate::validate_schedule(&to_rate_brackets(&body.brackets))?;

    let mut tx = state.db.begin().await?;

    let contract = sqlx::query_as::<_, Contract>(
        r#"INSERT INTO contracts (id, company_id, name, client_name, start_date, end_date, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(&body.name)
    .bind(&body.client_name)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_one(&mut *tx)
    .await?;

    insert_brackets(&mut tx, contract.id, auth.id, &body.brackets).await?;
    tx.commit().await?;

    let brackets = fetch_brackets(&state, contract.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ContractDetail { contract, brackets }),
    ))
}

/// List all contracts for the company
#[utoipa::path(
    get,
    path = "/api/v1/contracts",
    responses((status = 200, description = "List of contracts", body = Vec<Contract>)),
    security(("bearer_auth" = [])),
    tag = "Contracts"
)]
pub async fn list_contracts(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Contract>>> {
    let contracts = sqlx::query_as::<_, Contract>(
        "SELECT * FROM contracts WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(contracts))
}

/// Get a contract with its rate schedule
#[utoipa::path(
    get,
    path = "/api/v1/contracts/{contract_id}",
    params(("contract_id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract detail", body = ContractDetail),
        (status = 404, description = "Contract not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Contracts"
)]
pub async fn get_contract(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> AppResult<Json<ContractDetail>> {
    let contract = fetch_contract(&state, contract_id, auth.id).await?;
    let brackets = fetch_brackets(&state, contract.id).await?;
    Ok(Json(ContractDetail { contract, brackets }))
}

/// Replace a contract's rate schedule
#[utoipa::path(
    put,
    path = "/api/v1/contracts/{contract_id}/rate-schedule",
    request_body = SetRateScheduleRequest,
    params(("contract_id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Rate schedule replaced", body = ContractDetail),
        (status = 400, description = "Invalid rate schedule"),
        (status = 404, description = "Contract not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Contracts"
)]
pub async fn set_rate_schedule(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(body): Json<SetRateScheduleRequest>,
) -> AppResult<Json<ContractDetail>> {
    rebate::validate_schedule(&to_rate_brackets(&body.brackets))?;
    let contract = fetch_contract(&state, contract_id, auth.id).await?;

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM contract_brackets WHERE contract_id = $1")
        .bind(contract.id)
        .execute(&mut *tx)
        .await?;
    insert_brackets(&mut tx, contract.id, auth.id, &body.brackets).await?;
    sqlx::query("UPDATE contracts SET updated_at = NOW() WHERE id = $1")
        .bind(contract.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    state
        .record_audit(AuditEvent {
            company_id: auth.id,
            actor: auth.name.clone(),
            action: "contract.rate_schedule_replaced",
            detail: json!({
                "contract_id": contract.id,
                "bracket_count": body.brackets.len(),
            }),
        })
        .await;

    let brackets = fetch_brackets(&state, contract.id).await?;
    Ok(Json(ContractDetail { contract, brackets }))
}

/// Rebate (RFA) report: current revenue, projections and the rebate owed on each
#[utoipa::path(
    get,
    path = "/api/v1/contracts/{contract_id}/rebate",
    params(
        ("contract_id" = Uuid, Path, description = "Contract ID"),
        ("as_of" = Option<String>, Query, description = "Reference date (YYYY-MM-DD), defaults to today"),
    ),
    responses(
        (status = 200, description = "Rebate report", body = RebateReport),
        (status = 404, description = "Contract not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Contracts"
)]
pub async fn get_rebate_report(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<RebateReport>> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let contract = fetch_contract(&state, contract_id, auth.id).await?;
    let bracket_rows = fetch_brackets(&state, contract.id).await?;
    let schedule: Vec<rebate::RateBracket> = bracket_rows
        .iter()
        .map(|b| rebate::RateBracket {
            threshold: b.threshold,
            rate: b.rate,
        })
        .collect();

    let invoiced = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(total), 0) FROM customer_invoices
         WHERE contract_id = $1 AND company_id = $2",
    )
    .bind(contract.id)
    .bind(auth.id)
    .fetch_one(&state.db)
    .await?;

    let paid = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(paid), 0) FROM customer_invoices
         WHERE contract_id = $1 AND company_id = $2",
    )
    .bind(contract.id)
    .bind(auth.id)
    .fetch_one(&state.db)
    .await?;

    let (quote_count, quote_total) = sqlx::query_as::<_, (i64, Decimal)>(
        "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM quotes
         WHERE contract_id = $1 AND company_id = $2 AND status = 'pending'",
    )
    .bind(contract.id)
    .bind(auth.id)
    .fetch_one(&state.db)
    .await?;

    let (accepted, decided) = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*) FILTER (WHERE status = 'accepted'),
                COUNT(*) FILTER (WHERE status IN ('accepted', 'rejected'))
         FROM quotes WHERE contract_id = $1 AND company_id = $2",
    )
    .bind(contract.id)
    .bind(auth.id)
    .fetch_one(&state.db)
    .await?;

    // No decided quotes yet: assume half the pipeline converts.
    let conversion_rate = if decided > 0 {
        Decimal::from(accepted) / Decimal::from(decided)
    } else {
        dec!(0.5)
    };

    let snapshot = projection::build_snapshot(
        invoiced,
        paid,
        quote_count,
        quote_total,
        conversion_rate,
        contract.start_date,
        contract.end_date,
        as_of,
    );
    let projected = projection::project(contract.start_date, contract.end_date, &snapshot, as_of);

    let current = rebate::compute(snapshot.invoiced_amount, &schedule);
    let projected_end_of_year = rebate::compute(projected.end_of_year, &schedule);
    let projected_end_of_contract = rebate::compute(projected.end_of_contract, &schedule);

    Ok(Json(RebateReport {
        contract_id: contract.id,
        as_of,
        snapshot: rounded_snapshot(snapshot),
        projected: rounded_projection(projected),
        current: rounded_result(current),
        projected_end_of_year: rounded_result(projected_end_of_year),
        projected_end_of_contract: rounded_result(projected_end_of_contract),
    }))
}

// Monetary values keep full precision through the calculators and are only
// rounded here, when the report leaves the service.

fn rounded_snapshot(mut snapshot: RevenueSnapshot) -> RevenueSnapshot {
    snapshot.invoiced_amount = snapshot.invoiced_amount.round_dp(2);
    snapshot.paid_amount = snapshot.paid_amount.round_dp(2);
    snapshot.pending_quotes.total = snapshot.pending_quotes.total.round_dp(2);
    snapshot.pending_quotes.conversion_rate = snapshot.pending_quotes.conversion_rate.round_dp(4);
    snapshot.pending_quotes.weighted_amount = snapshot.pending_quotes.weighted_amount.round_dp(2);
    snapshot.period_progress.percentage = snapshot.period_progress.percentage.round_dp(2);
    snapshot
}

fn rounded_projection(mut projected: ProjectedRevenue) -> ProjectedRevenue {
    projected.prorata = projected.prorata.round_dp(2);
    projected.with_quotes = projected.with_quotes.round_dp(2);
    projected.end_of_year = projected.end_of_year.round_dp(2);
    projected.end_of_contract = projected.end_of_contract.round_dp(2);
    projected
}

fn rounded_result(mut result: RebateResult) -> RebateResult {
    result.total = result.total.round_dp(2);
    for slice in &mut result.brackets {
        slice.amount = slice.amount.round_dp(2);
        slice.rebate = slice.rebate.round_dp(2);
    }
    result
}
