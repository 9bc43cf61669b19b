// src/handlers/billing.rs

use crate::{
    auth::AuthCompany,
    errors::{AppError, AppResult},
    models::{
        CreateInvoiceRequest, CreateQuoteRequest, CustomerInvoice, Quote, RecordPaymentRequest,
        SetQuoteStatusRequest,
    },
    services::payment,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn ensure_contract_owned(
    state: &AppState,
    contract_id: Uuid,
    company_id: Uuid,
) -> AppResult<()> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM contracts WHERE id = $1 AND company_id = $2")
        .bind(contract_id)
        .bind(company_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", contract_id)))?;
    Ok(())
}

/// Issue a customer invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = CustomerInvoice),
        (status = 400, description = "Invalid amount"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn create_invoice(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<CustomerInvoice>)> {
    if body.total <= dec!(0) {
        return Err(AppError::Validation(
            "Invoice total must be greater than zero".to_string(),
        ));
    }
    if let Some(contract_id) = body.contract_id {
        ensure_contract_owned(&state, contract_id, auth.id).await?;
    }

    let invoice = sqlx::query_as::<_, CustomerInvoice>(
        r#"INSERT INTO customer_invoices (
            id, company_id, contract_id, reference, issue_date, due_date, total, paid, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.contract_id)
    .bind(&body.reference)
    .bind(body.issue_date)
    .bind(body.due_date)
    .bind(body.total)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

/// List all customer invoices for the company
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    responses((status = 200, description = "List of invoices", body = Vec<CustomerInvoice>)),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn list_invoices(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CustomerInvoice>>> {
    let invoices = sqlx::query_as::<_, CustomerInvoice>(
        "SELECT * FROM customer_invoices WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(invoices))
}

/// Record a payment against a customer invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{invoice_id}/payments",
    request_body = RecordPaymentRequest,
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Payment recorded", body = CustomerInvoice),
        (status = 400, description = "Payment would exceed the invoice total"),
        (status = 404, description = "Invoice not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn record_invoice_payment(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<RecordPaymentRequest>,
) -> AppResult<Json<CustomerInvoice>> {
    let invoice = sqlx::query_as::<_, CustomerInvoice>(
        "SELECT * FROM customer_invoices WHERE id = $1 AND company_id = $2",
    )
    .bind(invoice_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))?;

    payment::ensure_within_balance(invoice.paid, invoice.total, body.amount)?;

    // The balance guard is repeated in SQL: a payment recorded concurrently
    // since the read above makes this update match no row.
    sqlx::query_as::<_, CustomerInvoice>(
        "UPDATE customer_invoices SET paid = paid + $1
         WHERE id = $2 AND paid + $1 <= total
         RETURNING *",
    )
    .bind(body.amount)
    .bind(invoice.id)
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or_else(|| {
        AppError::Validation(format!(
            "Payment of {} would exceed the outstanding balance",
            body.amount
        ))
    })
}

/// Create a quote attached to a contract
#[utoipa::path(
    post,
    path = "/api/v1/quotes",
    request_body = CreateQuoteRequest,
    responses(
        (status = 201, description = "Quote created", body = Quote),
        (status = 404, description = "Contract not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn create_quote(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateQuoteRequest>,
) -> AppResult<(StatusCode, Json<Quote>)> {
    if body.amount <= dec!(0) {
        return Err(AppError::Validation(
            "Quote amount must be greater than zero".to_string(),
        ));
    }
    ensure_contract_owned(&state, body.contract_id, auth.id).await?;

    let quote = sqlx::query_as::<_, Quote>(
        r#"INSERT INTO quotes (id, company_id, contract_id, reference, amount, status, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, 'pending', NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(body.contract_id)
    .bind(&body.reference)
    .bind(body.amount)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(quote)))
}

/// List all quotes for the company
#[utoipa::path(
    get,
    path = "/api/v1/quotes",
    responses((status = 200, description = "List of quotes", body = Vec<Quote>)),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn list_quotes(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Quote>>> {
    let quotes = sqlx::query_as::<_, Quote>(
        "SELECT * FROM quotes WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(quotes))
}

/// Accept or reject a quote. Decided quotes feed the historical conversion
/// rate used by revenue projections.
#[utoipa::path(
    patch,
    path = "/api/v1/quotes/{quote_id}/status",
    request_body = SetQuoteStatusRequest,
    params(("quote_id" = Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote status updated", body = Quote),
        (status = 404, description = "Quote not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn set_quote_status(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(quote_id): Path<Uuid>,
    Json(body): Json<SetQuoteStatusRequest>,
) -> AppResult<Json<Quote>> {
    let quote = sqlx::query_as::<_, Quote>(
        r#"UPDATE quotes SET status = $1, updated_at = NOW()
           WHERE id = $2 AND company_id = $3
           RETURNING *"#,
    )
    .bind(body.status)
    .bind(quote_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Quote {} not found", quote_id)))?;

    Ok(Json(quote))
}
