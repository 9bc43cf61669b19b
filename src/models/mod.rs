// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Company (tenant) ─────────────────────────────────────────────────────────

#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub company: CompanyPublic,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CompanyPublic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Company> for CompanyPublic {
    fn from(company: Company) -> Self {
        CompanyPublic {
            id: company.id,
            name: company.name,
            email: company.email,
            created_at: company.created_at,
        }
    }
}

// ─── Contract & rebate schedule ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Contract {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a contract's progressive rate schedule. `threshold` is the lower
/// revenue bound of the bracket; the upper bound is the next row's threshold.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ContractBracket {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub threshold: Decimal,
    /// Marginal rebate rate as a percentage, e.g. 1.5 means 1.5%
    pub rate: Decimal,
    pub position: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BracketInput {
    pub threshold: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContractRequest {
    pub name: String,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub brackets: Vec<BracketInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRateScheduleRequest {
    pub brackets: Vec<BracketInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContractDetail {
    #[serde(flatten)]
    pub contract: Contract,
    pub brackets: Vec<ContractBracket>,
}

// ─── Customer invoices & quotes ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CustomerInvoice {
    pub id: Uuid,
    pub company_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub reference: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub total: Decimal,
    pub paid: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    pub contract_id: Option<Uuid>,
    pub reference: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub total: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "quote_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Quote {
    pub id: Uuid,
    pub company_id: Uuid,
    pub contract_id: Uuid,
    pub reference: String,
    pub amount: Decimal,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQuoteRequest {
    pub contract_id: Uuid,
    pub reference: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQuoteStatusRequest {
    pub status: QuoteStatus,
}

// ─── Payables ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Due,
    Pending,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SupplierInvoice {
    pub id: Uuid,
    pub company_id: Uuid,
    pub supplier_name: String,
    pub supplier_iban: String,
    pub supplier_bic: Option<String>,
    pub reference: String,
    pub due_date: Option<NaiveDate>,
    pub total: Decimal,
    pub paid: Decimal,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSupplierInvoiceRequest {
    pub supplier_name: String,
    pub supplier_iban: String,
    pub supplier_bic: Option<String>,
    pub reference: String,
    pub due_date: Option<NaiveDate>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "expense_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Draft,
    Approved,
    Pending,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ExpenseReport {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_name: String,
    pub iban: String,
    pub bic: Option<String>,
    pub description: String,
    pub amount: Decimal,
    pub status: ExpenseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateExpenseReportRequest {
    pub employee_name: String,
    pub iban: String,
    pub bic: Option<String>,
    pub description: String,
    pub amount: Decimal,
}

// ─── Bank accounts & SEPA batches ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BankAccount {
    pub id: Uuid,
    pub company_id: Uuid,
    pub account_name: String,
    pub iban: String,
    pub bic: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBankAccountRequest {
    pub account_name: String,
    pub iban: String,
    pub bic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    SupplierInvoice,
    ExpenseReport,
}

/// A payment eligible for inclusion in a SEPA batch. `selectable` is false
/// when the beneficiary BIC is missing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DuePayment {
    pub id: Uuid,
    pub kind: PaymentKind,
    pub beneficiary: String,
    pub iban: String,
    pub bic: Option<String>,
    pub amount: Decimal,
    pub reference: String,
    pub description: String,
    pub selectable: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateBatchRequest {
    pub bank_account_id: Uuid,
    pub execution_date: NaiveDate,
    #[serde(default)]
    pub supplier_invoice_ids: Vec<Uuid>,
    #[serde(default)]
    pub expense_report_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SepaBatch {
    pub id: Uuid,
    pub company_id: Uuid,
    pub bank_account_id: Uuid,
    pub message_id: String,
    pub execution_date: NaiveDate,
    pub payment_count: i32,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SepaBatchResponse {
    #[serde(flatten)]
    pub batch: SepaBatch,
    pub filename: String,
    pub xml: String,
}

// ─── Revenue snapshot & projections ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeriodProgress {
    pub days_elapsed: i64,
    pub total_days: i64,
    /// Share of the contract period already elapsed, as a percentage
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PendingQuotes {
    pub count: i64,
    pub total: Decimal,
    pub conversion_rate: Decimal,
    pub weighted_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RevenueSnapshot {
    pub invoiced_amount: Decimal,
    pub paid_amount: Decimal,
    pub pending_quotes: PendingQuotes,
    pub period_progress: PeriodProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProjectedRevenue {
    pub prorata: Decimal,
    pub with_quotes: Decimal,
    pub end_of_year: Decimal,
    pub end_of_contract: Decimal,
}

// ─── Rebate (RFA) results ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BracketSlice {
    pub label: String,
    pub rate: Decimal,
    /// Revenue falling within this bracket
    pub amount: Decimal,
    /// Rebate owed on that slice
    pub rebate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RebateResult {
    pub total: Decimal,
    pub brackets: Vec<BracketSlice>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RebateReport {
    pub contract_id: Uuid,
    pub as_of: NaiveDate,
    pub snapshot: RevenueSnapshot,
    pub projected: ProjectedRevenue,
    pub current: RebateResult,
    pub projected_end_of_year: RebateResult,
    pub projected_end_of_contract: RebateResult,
}

// ─── Aging report ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AgingBucketRow {
    pub label: String,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
    pub receivables: Decimal,
    pub payables: Decimal,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgingReport {
    pub as_of: NaiveDate,
    pub buckets: Vec<AgingBucketRow>,
    pub total_receivables: Decimal,
    pub total_payables: Decimal,
}

// ─── JWT Claims ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub company_name: String,
    pub exp: usize,
    pub iat: usize,
}
