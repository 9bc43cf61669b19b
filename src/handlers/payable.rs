// src/handlers/payable.rs
//
// Supplier invoices, expense reports, bank accounts and SEPA batch
// generation. Marking payments pending happens in the same transaction as
// recording the batch, so a generated file and its status flips cannot
// diverge.

use crate::{
    audit::AuditEvent,
    auth::AuthCompany,
    errors::{AppError, AppResult},
    models::{
        BankAccount, CreateBankAccountRequest, CreateExpenseReportRequest,
        CreateSupplierInvoiceRequest, DuePayment, ExpenseReport, ExpenseStatus,
        GenerateBatchRequest, PaymentKind, RecordPaymentRequest, SepaBatch, SepaBatchResponse,
        SupplierInvoice,
    },
    services::{
        payment,
        sepa::{self, SepaPayment},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

// ─── Supplier invoices ────────────────────────────────────────────────────────

/// Record a supplier invoice
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    request_body = CreateSupplierInvoiceRequest,
    responses(
        (status = 201, description = "Supplier invoice created", body = SupplierInvoice),
        (status = 400, description = "Invalid amount"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payables"
)]
pub async fn create_supplier_invoice(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateSupplierInvoiceRequest>,
) -> AppResult<(StatusCode, Json<SupplierInvoice>)> {
    if body.total <= dec!(0) {
        return Err(AppError::Validation(
            "Invoice total must be greater than zero".to_string(),
        ));
    }
    if body.supplier_iban.trim().is_empty() {
        return Err(AppError::Validation(
            "Supplier IBAN is required".to_string(),
        ));
    }

    let invoice = sqlx::query_as::<_, SupplierInvoice>(
        r#"INSERT INTO supplier_invoices (
            id, company_id, supplier_name, supplier_iban, supplier_bic,
            reference, due_date, total, paid, payment_status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 'due', NOW(), NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(&body.supplier_name)
    .bind(&body.supplier_iban)
    .bind(&body.supplier_bic)
    .bind(&body.reference)
    .bind(body.due_date)
    .bind(body.total)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

/// List all supplier invoices for the company
#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    responses((status = 200, description = "List of supplier invoices", body = Vec<SupplierInvoice>)),
    security(("bearer_auth" = [])),
    tag = "Payables"
)]
pub async fn list_supplier_invoices(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SupplierInvoice>>> {
    let invoices = sqlx::query_as::<_, SupplierInvoice>(
        "SELECT * FROM supplier_invoices WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(invoices))
}

/// Record a payment against a supplier invoice
#[utoipa::path(
    post,
    path = "/api/v1/purchases/{invoice_id}/payments",
    request_body = RecordPaymentRequest,
    params(("invoice_id" = Uuid, Path, description = "Supplier invoice ID")),
    responses(
        (status = 200, description = "Payment recorded", body = SupplierInvoice),
        (status = 400, description = "Payment would exceed the invoice total"),
        (status = 404, description = "Supplier invoice not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payables"
)]
pub async fn record_supplier_payment(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<RecordPaymentRequest>,
) -> AppResult<Json<SupplierInvoice>> {
    let invoice = sqlx::query_as::<_, SupplierInvoice>(
        "SELECT * FROM supplier_invoices WHERE id = $1 AND company_id = $2",
    )
    .bind(invoice_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Supplier invoice {} not found", invoice_id)))?;

    payment::ensure_within_balance(invoice.paid, invoice.total, body.amount)?;

    // The balance guard is repeated in SQL: a payment recorded concurrently
    // since the read above makes this update match no row.
    sqlx::query_as::<_, SupplierInvoice>(
        r#"UPDATE supplier_invoices
           SET paid = paid + $1,
               payment_status = CASE WHEN paid + $1 >= total THEN 'paid'::payment_status
                                     ELSE payment_status END,
               updated_at = NOW()
           WHERE id = $2 AND paid + $1 <= total
           RETURNING *"#,
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

// ─── Expense reports ──────────────────────────────────────────────────────────

/// Create an expense report (draft)
#[utoipa::path(
    post,
    path = "/api/v1/expense-reports",
    request_body = CreateExpenseReportRequest,
    responses(
        (status = 201, description = "Expense report created", body = ExpenseReport),
        (status = 400, description = "Invalid amount"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payables"
)]
pub async fn create_expense_report(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateExpenseReportRequest>,
) -> AppResult<(StatusCode, Json<ExpenseReport>)> {
    if body.amount <= dec!(0) {
        return Err(AppError::Validation(
            "Expense amount must be greater than zero".to_string(),
        ));
    }
    if body.iban.trim().is_empty() {
        return Err(AppError::Validation(
            "Employee IBAN is required".to_string(),
        ));
    }

    let report = sqlx::query_as::<_, ExpenseReport>(
        r#"INSERT INTO expense_reports (
            id, company_id, employee_name, iban, bic, description, amount, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', NOW(), NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(&body.employee_name)
    .bind(&body.iban)
    .bind(&body.bic)
    .bind(&body.description)
    .bind(body.amount)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

/// Approve a draft expense report, making it payable
#[utoipa::path(
    post,
    path = "/api/v1/expense-reports/{report_id}/approve",
    params(("report_id" = Uuid, Path, description = "Expense report ID")),
    responses(
        (status = 200, description = "Expense report approved", body = ExpenseReport),
        (status = 404, description = "Expense report not found"),
        (status = 409, description = "Expense report is not a draft"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payables"
)]
pub async fn approve_expense_report(
    auth: AuthCompany,
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ExpenseReport>> {
    let report = sqlx::query_as::<_, ExpenseReport>(
        "SELECT * FROM expense_reports WHERE id = $1 AND company_id = $2",
    )
    .bind(report_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Expense report {} not found", report_id)))?;

    if report.status != ExpenseStatus::Draft {
        return Err(AppError::Conflict(
            "Only draft expense reports can be approved".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, ExpenseReport>(
        "UPDATE expense_reports SET status = 'approved', updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(report.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(updated))
}

/// List all expense reports for the company
#[utoipa::path(
    get,
    path = "/api/v1/expense-reports",
    responses((status = 200, description = "List of expense reports", body = Vec<ExpenseReport>)),
    security(("bearer_auth" = [])),
    tag = "Payables"
)]
pub async fn list_expense_reports(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ExpenseReport>>> {
    let reports = sqlx::query_as::<_, ExpenseReport>(
        "SELECT * FROM expense_reports WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(reports))
}

// ─── Bank accounts ────────────────────────────────────────────────────────────

/// Register a bank account used as the debtor side of SEPA batches
#[utoipa::path(
    post,
    path = "/api/v1/bank-accounts",
    request_body = CreateBankAccountRequest,
    responses(
        (status = 201, description = "Bank account created", body = BankAccount),
        (status = 400, description = "Missing IBAN or BIC"),
    ),
    security(("bearer_auth" = [])),
    tag = "SEPA"
)]
pub async fn create_bank_account(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<CreateBankAccountRequest>,
) -> AppResult<(StatusCode, Json<BankAccount>)> {
    if body.iban.trim().is_empty() || body.bic.trim().is_empty() {
        return Err(AppError::Validation(
            "Bank account IBAN and BIC are required".to_string(),
        ));
    }

    let account = sqlx::query_as::<_, BankAccount>(
        r#"INSERT INTO bank_accounts (id, company_id, account_name, iban, bic, created_at)
           VALUES ($1, $2, $3, $4, $5, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(&body.account_name)
    .bind(&body.iban)
    .bind(&body.bic)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// List the company's bank accounts
#[utoipa::path(
    get,
    path = "/api/v1/bank-accounts",
    responses((status = 200, description = "List of bank accounts", body = Vec<BankAccount>)),
    security(("bearer_auth" = [])),
    tag = "SEPA"
)]
pub async fn list_bank_accounts(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BankAccount>>> {
    let accounts = sqlx::query_as::<_, BankAccount>(
        "SELECT * FROM bank_accounts WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(accounts))
}

// ─── SEPA batches ─────────────────────────────────────────────────────────────

/// List payments eligible for a SEPA batch. Entries without a BIC are
/// returned but flagged unselectable.
#[utoipa::path(
    get,
    path = "/api/v1/sepa/payments/due",
    responses((status = 200, description = "Due payments", body = Vec<DuePayment>)),
    security(("bearer_auth" = [])),
    tag = "SEPA"
)]
pub async fn list_due_payments(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DuePayment>>> {
    let invoices = sqlx::query_as::<_, SupplierInvoice>(
        "SELECT * FROM supplier_invoices
         WHERE company_id = $1 AND payment_status = 'due' AND paid < total
         ORDER BY due_date NULLS LAST",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    let reports = sqlx::query_as::<_, ExpenseReport>(
        "SELECT * FROM expense_reports
         WHERE company_id = $1 AND status = 'approved'
         ORDER BY created_at",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    let mut payments: Vec<DuePayment> = invoices
        .into_iter()
        .map(|inv| {
            let selectable = has_bic(&inv.supplier_bic);
            let description = supplier_remittance(&inv.reference);
            DuePayment {
                id: inv.id,
                kind: PaymentKind::SupplierInvoice,
                beneficiary: inv.supplier_name,
                iban: inv.supplier_iban,
                bic: inv.supplier_bic,
                amount: inv.total - inv.paid,
                reference: inv.reference,
                description,
                selectable,
            }
        })
        .collect();

    payments.extend(reports.into_iter().map(|report| {
        let selectable = has_bic(&report.bic);
        DuePayment {
            id: report.id,
            kind: PaymentKind::ExpenseReport,
            beneficiary: report.employee_name,
            iban: report.iban,
            bic: report.bic,
            amount: report.amount,
            reference: expense_reference(report.id),
            description: report.description,
            selectable,
        }
    }));

    Ok(Json(payments))
}

/// Generate a pain.001 batch for the selected payments and mark them pending
#[utoipa::path(
    post,
    path = "/api/v1/sepa/batches",
    request_body = GenerateBatchRequest,
    responses(
        (status = 201, description = "Batch generated", body = SepaBatchResponse),
        (status = 400, description = "Empty selection or invalid payment state"),
        (status = 404, description = "Bank account or payment not found"),
        (status = 422, description = "A selected payment has no BIC"),
    ),
    security(("bearer_auth" = [])),
    tag = "SEPA"
)]
pub async fn generate_sepa_batch(
    auth: AuthCompany,
    State(state): State<AppState>,
    Json(body): Json<GenerateBatchRequest>,
) -> AppResult<(StatusCode, Json<SepaBatchResponse>)> {
    if body.supplier_invoice_ids.is_empty() && body.expense_report_ids.is_empty() {
        return Err(AppError::EmptyBatch);
    }

    let account = sqlx::query_as::<_, BankAccount>(
        "SELECT * FROM bank_accounts WHERE id = $1 AND company_id = $2",
    )
    .bind(body.bank_account_id)
    .bind(auth.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!("Bank account {} not found", body.bank_account_id))
    })?;

    let invoices = sqlx::query_as::<_, SupplierInvoice>(
        "SELECT * FROM supplier_invoices WHERE id = ANY($1) AND company_id = $2",
    )
    .bind(&body.supplier_invoice_ids)
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    if invoices.len() != body.supplier_invoice_ids.len() {
        return Err(AppError::NotFound(
            "One or more selected supplier invoices do not exist".to_string(),
        ));
    }

    let reports = sqlx::query_as::<_, ExpenseReport>(
        "SELECT * FROM expense_reports WHERE id = ANY($1) AND company_id = $2",
    )
    .bind(&body.expense_report_ids)
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    if reports.len() != body.expense_report_ids.len() {
        return Err(AppError::NotFound(
            "One or more selected expense reports do not exist".to_string(),
        ));
    }

    let mut payments = Vec::with_capacity(invoices.len() + reports.len());
    for invoice in &invoices {
        if invoice.payment_status != crate::models::PaymentStatus::Due {
            return Err(AppError::BadRequest(format!(
                "Supplier invoice '{}' is not due",
                invoice.reference
            )));
        }
        payments.push(SepaPayment {
            id: invoice.id,
            kind: PaymentKind::SupplierInvoice,
            beneficiary: invoice.supplier_name.clone(),
            iban: invoice.supplier_iban.clone(),
            bic: invoice.supplier_bic.clone(),
            amount: invoice.total - invoice.paid,
            reference: invoice.reference.clone(),
            description: supplier_remittance(&invoice.reference),
        });
    }
    for report in &reports {
        if report.status != ExpenseStatus::Approved {
            return Err(AppError::BadRequest(format!(
                "Expense report for '{}' is not approved",
                report.employee_name
            )));
        }
        payments.push(SepaPayment {
            id: report.id,
            kind: PaymentKind::ExpenseReport,
            beneficiary: report.employee_name.clone(),
            iban: report.iban.clone(),
            bic: report.bic.clone(),
            amount: report.amount,
            reference: expense_reference(report.id),
            description: report.description.clone(),
        });
    }

    let now = Utc::now();
    let message_id = format!(
        "SEPA-{}-{}",
        now.format("%Y%m%d%H%M%S"),
        &Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    );

    let built = sepa::build_batch(
        &account,
        &auth.name,
        &payments,
        body.execution_date,
        now,
        &message_id,
    )?;

    // Batch record and status flips commit together or not at all.
    let mut tx = state.db.begin().await?;

    let batch = sqlx::query_as::<_, SepaBatch>(
        r#"INSERT INTO sepa_batches (
            id, company_id, bank_account_id, message_id, execution_date,
            payment_count, total_amount, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.id)
    .bind(account.id)
    .bind(&built.message_id)
    .bind(body.execution_date)
    .bind(built.payment_count as i32)
    .bind(built.total_amount.round_dp(2))
    .fetch_one(&mut *tx)
    .await?;

    // The flips only touch rows still in their payable state; a shortfall
    // means a concurrent batch claimed one of them since the pre-check, and
    // the whole transaction rolls back.
    if !body.supplier_invoice_ids.is_empty() {
        let flipped = sqlx::query(
            "UPDATE supplier_invoices SET payment_status = 'pending', updated_at = NOW()
             WHERE id = ANY($1) AND payment_status = 'due'",
        )
        .bind(&body.supplier_invoice_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        sepa::ensure_all_marked(body.supplier_invoice_ids.len(), flipped)?;
    }
    if !body.expense_report_ids.is_empty() {
        let flipped = sqlx::query(
            "UPDATE expense_reports SET status = 'pending', updated_at = NOW()
             WHERE id = ANY($1) AND status = 'approved'",
        )
        .bind(&body.expense_report_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        sepa::ensure_all_marked(body.expense_report_ids.len(), flipped)?;
    }

    tx.commit().await?;

    info!(
        "SEPA batch {} generated: {} payments, total {}",
        built.message_id, built.payment_count, built.total_amount
    );

    state
        .record_audit(AuditEvent {
            company_id: auth.id,
            actor: auth.name.clone(),
            action: "sepa.batch_generated",
            detail: json!({
                "batch_id": batch.id,
                "message_id": built.message_id,
                "payment_count": built.payment_count,
                "total_amount": built.total_amount.round_dp(2).to_string(),
            }),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(SepaBatchResponse {
            batch,
            filename: built.filename,
            xml: built.xml,
        }),
    ))
}

/// List generated SEPA batches
#[utoipa::path(
    get,
    path = "/api/v1/sepa/batches",
    responses((status = 200, description = "Batch history", body = Vec<SepaBatch>)),
    security(("bearer_auth" = [])),
    tag = "SEPA"
)]
pub async fn list_sepa_batches(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SepaBatch>>> {
    let batches = sqlx::query_as::<_, SepaBatch>(
        "SELECT * FROM sepa_batches WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(batches))
}

fn has_bic(bic: &Option<String>) -> bool {
    bic.as_deref().is_some_and(|b| !b.trim().is_empty())
}

fn expense_reference(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("NDF-{}", &hex[..8].to_uppercase())
}

// Same remittance text in the due-payments preview and the generated batch.
fn supplier_remittance(reference: &str) -> String {
    format!("Facture {reference}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_and_batch_share_remittance_text() {
        assert_eq!(supplier_remittance("FAC-2024-042"), "Facture FAC-2024-042");
    }

    #[test]
    fn expense_reference_is_short_and_stable() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(expense_reference(id), "NDF-A1B2C3D4");
        assert_eq!(expense_reference(id), expense_reference(id));
    }

    #[test]
    fn blank_bic_is_not_selectable() {
        assert!(has_bic(&Some("AGRIFRPP".to_string())));
        assert!(!has_bic(&Some("   ".to_string())));
        assert!(!has_bic(&None));
    }
}
