// src/handlers/company.rs

use crate::{
    audit::AuditEvent,
    auth::{AuthCompany, generate_token},
    errors::{AppError, AppResult},
    models::{AuthResponse, Company, CompanyPublic, CreateCompanyRequest, LoginRequest},
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use bcrypt::{DEFAULT_COST, hash, verify};
use serde_json::json;
use uuid::Uuid;

/// Register a new company
#[utoipa::path(
    post,
    path = "/api/v1/companies/register",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company registered", body = AuthResponse),
        (status = 409, description = "Email already exists"),
    ),
    tag = "Companies"
)]
pub async fn register_company(
    State(state): State<AppState>,
    Json(body): Json<CreateCompanyRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    // Check for duplicate email
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM companies WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "Company with email '{}' already exists",
            body.email
        )));
    }

    let password_hash =
        hash(&body.password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    let company = sqlx::query_as::<_, Company>(
        r#"INSERT INTO companies (id, name, email, password_hash, created_at, updated_at)
           VALUES ($1, $2, $3, $4, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.name)
    .bind(&body.email)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await?;

    let token = generate_token(
        company.id,
        &company.name,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    state
        .record_audit(AuditEvent {
            company_id: company.id,
            actor: company.email.clone(),
            action: "company.register",
            detail: json!({ "name": company.name }),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            company: company.into(),
        }),
    ))
}

/// Login a company
#[utoipa::path(
    post,
    path = "/api/v1/companies/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Companies"
)]
pub async fn login_company(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = verify(&body.password, &company.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = generate_token(
        company.id,
        &company.name,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    state
        .record_audit(AuditEvent {
            company_id: company.id,
            actor: company.email.clone(),
            action: "company.login",
            detail: json!({}),
        })
        .await;

    Ok(Json(AuthResponse {
        token,
        company: company.into(),
    }))
}

/// Get current company profile
#[utoipa::path(
    get,
    path = "/api/v1/companies/me",
    responses(
        (status = 200, description = "Company profile", body = CompanyPublic),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Companies"
)]
pub async fn get_company_profile(
    auth: AuthCompany,
    State(state): State<AppState>,
) -> AppResult<Json<CompanyPublic>> {
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    Ok(Json(company.into()))
}
