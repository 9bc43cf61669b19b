// src/routes/mod.rs

use crate::{
    handlers::{
        billing::{
            create_invoice, create_quote, list_invoices, list_quotes, record_invoice_payment,
            set_quote_status,
        },
        company::{get_company_profile, login_company, register_company},
        contract::{
            create_contract, get_contract, get_rebate_report, list_contracts, set_rate_schedule,
        },
        payable::{
            approve_expense_report, create_bank_account, create_expense_report,
            create_supplier_invoice, generate_sepa_batch, list_bank_accounts, list_due_payments,
            list_expense_reports, list_sepa_batches, list_supplier_invoices,
            record_supplier_payment,
        },
        report::aging_report,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Companies ────────────────────────────────────────
        .route("/companies/register", post(register_company))
        .route("/companies/login", post(login_company))
        .route("/companies/me", get(get_company_profile))
        // ─── Contracts & rebates ──────────────────────────────
        .route("/contracts", post(create_contract).get(list_contracts))
        .route("/contracts/{contract_id}", get(get_contract))
        .route(
            "/contracts/{contract_id}/rate-schedule",
            put(set_rate_schedule),
        )
        .route("/contracts/{contract_id}/rebate", get(get_rebate_report))
        // ─── Billing ──────────────────────────────────────────
        .route("/invoices", post(create_invoice).get(list_invoices))
        .route("/invoices/{invoice_id}/payments", post(record_invoice_payment))
        .route("/quotes", post(create_quote).get(list_quotes))
        .route("/quotes/{quote_id}/status", patch(set_quote_status))
        // ─── Payables ─────────────────────────────────────────
        .route(
            "/purchases",
            post(create_supplier_invoice).get(list_supplier_invoices),
        )
        .route(
            "/purchases/{invoice_id}/payments",
            post(record_supplier_payment),
        )
        .route(
            "/expense-reports",
            post(create_expense_report).get(list_expense_reports),
        )
        .route(
            "/expense-reports/{report_id}/approve",
            post(approve_expense_report),
        )
        // ─── SEPA ─────────────────────────────────────────────
        .route(
            "/bank-accounts",
            post(create_bank_account).get(list_bank_accounts),
        )
        .route("/sepa/payments/due", get(list_due_payments))
        .route(
            "/sepa/batches",
            post(generate_sepa_batch).get(list_sepa_batches),
        )
        // ─── Reports ──────────────────────────────────────────
        .route("/reports/aging", get(aging_report))
}
