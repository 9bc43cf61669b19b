// src/openapi.rs

use crate::models::{
    AgingBucketRow, AgingReport, AuthResponse, BankAccount, BracketInput, BracketSlice,
    CompanyPublic, Contract, ContractBracket, ContractDetail, CreateBankAccountRequest,
    CreateCompanyRequest, CreateContractRequest, CreateExpenseReportRequest, CreateInvoiceRequest,
    CreateQuoteRequest, CreateSupplierInvoiceRequest, CustomerInvoice, DuePayment, ExpenseReport,
    ExpenseStatus, GenerateBatchRequest, LoginRequest, PaymentKind, PaymentStatus,
    PendingQuotes, PeriodProgress, ProjectedRevenue, Quote, QuoteStatus, RebateReport,
    RebateResult, RecordPaymentRequest, RevenueSnapshot, SepaBatch, SepaBatchResponse,
    SetQuoteStatusRequest, SetRateScheduleRequest, SupplierInvoice,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Treasury System API",
        version = "1.0.0",
        description = "Multi-company invoicing and treasury API built with Rust and Axum. \
            Covers customer invoicing and quotes, progressive end-of-year rebate (RFA) \
            reports with revenue projections, receivables/payables aging, and SEPA \
            pain.001 payment batch generation for supplier invoices and expense reports.",
        license(name = "MIT")
    ),
    paths(
        // Companies
        crate::handlers::company::register_company,
        crate::handlers::company::login_company,
        crate::handlers::company::get_company_profile,
        // Contracts & rebates
        crate::handlers::contract::create_contract,
        crate::handlers::contract::list_contracts,
        crate::handlers::contract::get_contract,
        crate::handlers::contract::set_rate_schedule,
        crate::handlers::contract::get_rebate_report,
        // Billing
        crate::handlers::billing::create_invoice,
        crate::handlers::billing::list_invoices,
        crate::handlers::billing::record_invoice_payment,
        crate::handlers::billing::create_quote,
        crate::handlers::billing::list_quotes,
        crate::handlers::billing::set_quote_status,
        // Payables
        crate::handlers::payable::create_supplier_invoice,
        crate::handlers::payable::list_supplier_invoices,
        crate::handlers::payable::record_supplier_payment,
        crate::handlers::payable::create_expense_report,
        crate::handlers::payable::approve_expense_report,
        crate::handlers::payable::list_expense_reports,
        // SEPA
        crate::handlers::payable::create_bank_account,
        crate::handlers::payable::list_bank_accounts,
        crate::handlers::payable::list_due_payments,
        crate::handlers::payable::generate_sepa_batch,
        crate::handlers::payable::list_sepa_batches,
        // Reports
        crate::handlers::report::aging_report,
    ),
    components(
        schemas(
            CreateCompanyRequest, LoginRequest, AuthResponse, CompanyPublic,
            Contract, ContractBracket, ContractDetail, BracketInput,
            CreateContractRequest, SetRateScheduleRequest,
            CustomerInvoice, CreateInvoiceRequest, RecordPaymentRequest,
            Quote, QuoteStatus, CreateQuoteRequest, SetQuoteStatusRequest,
            SupplierInvoice, PaymentStatus, CreateSupplierInvoiceRequest,
            ExpenseReport, ExpenseStatus, CreateExpenseReportRequest,
            BankAccount, CreateBankAccountRequest,
            PaymentKind, DuePayment, GenerateBatchRequest, SepaBatch, SepaBatchResponse,
            PeriodProgress, PendingQuotes, RevenueSnapshot, ProjectedRevenue,
            BracketSlice, RebateResult, RebateReport,
            AgingBucketRow, AgingReport,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Companies", description = "Register, login, and manage your company"),
        (name = "Contracts", description = "Contracts, rate schedules and rebate reports"),
        (name = "Billing", description = "Customer invoices and quotes"),
        (name = "Payables", description = "Supplier invoices and expense reports"),
        (name = "SEPA", description = "Bank accounts and pain.001 payment batches"),
        (name = "Reports", description = "Aging and treasury reports"),
    )
)]
pub struct ApiDoc;
