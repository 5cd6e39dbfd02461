//! API Routes
//!
//! Thin HTTP endpoint definitions over the core engines. No business logic
//! lives here: handlers parse, delegate and serialize.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Account, Amount, Clock, Credit, DomainError, Payment, PaymentScheduleEntry, Transfer, User,
};
use crate::engine::{
    BalancePoint, CreditLedger, CreditLoad, CreditPolicy, ForecastEngine, IncomeExpense,
    MonthlyStats, TransferEngine,
};
use crate::error::AppError;
use crate::external::{NotificationSink, RateSource};
use crate::store::{AccountStore, UserStore};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub policy: CreditPolicy,
    pub rates: Arc<dyn RateSource>,
    pub notifier: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    fn transfer_engine(&self) -> TransferEngine {
        TransferEngine::new(self.pool.clone(), self.clock.clone())
    }

    fn credit_ledger(&self) -> CreditLedger {
        CreditLedger::new(
            self.pool.clone(),
            self.policy.clone(),
            self.rates.clone(),
            self.notifier.clone(),
            self.clock.clone(),
        )
    }

    fn forecast_engine(&self) -> ForecastEngine {
        ForecastEngine::new(self.pool.clone(), self.clock.clone())
    }
}

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub user_id: Uuid,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "RUB".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueCreditRequest {
    pub user_id: Uuid,
    pub principal: String,
    pub term_months: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApplyPaymentRequest {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    #[serde(default = "default_horizon")]
    pub days: u32,
}

fn default_horizon() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: i32,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users", post(create_user))
        .route("/users/:user_id", get(get_user))
        // Accounts
        .route("/accounts", post(create_account))
        .route("/accounts/:account_id", get(get_account))
        .route("/users/:user_id/accounts", get(list_user_accounts))
        // Transfers
        .route("/transfers", post(transfer))
        .route("/transfers/:transfer_id", get(get_transfer))
        .route("/accounts/:account_id/transfers", get(account_transfers))
        // Credits
        .route("/credits", post(issue_credit))
        .route("/credits/:credit_id", get(get_credit))
        .route("/users/:user_id/credits", get(list_user_credits))
        .route("/credits/:credit_id/schedule", get(credit_schedule))
        .route(
            "/credits/:credit_id/payments",
            get(credit_payments).post(apply_payment),
        )
        // Analytics
        .route("/users/:user_id/forecast", get(forecast))
        .route("/users/:user_id/income-expense", get(income_expense))
        .route("/users/:user_id/monthly-stats", get(monthly_stats))
        .route("/users/:user_id/credit-load", get(credit_load))
}

// =========================================================================
// Users
// =========================================================================

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if request.username.trim().is_empty() || request.email.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "username and email must not be empty".to_string(),
        ));
    }

    let user = UserStore::new(state.pool.clone())
        .create(request.username.trim(), request.email.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = UserStore::new(state.pool.clone())
        .get(user_id)
        .await?
        .ok_or(DomainError::UserNotFound(user_id))?;

    Ok(Json(user))
}

// =========================================================================
// Accounts
// =========================================================================

async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let users = UserStore::new(state.pool.clone());
    if users.get(request.user_id).await?.is_none() {
        return Err(DomainError::UserNotFound(request.user_id).into());
    }

    let currency = request.currency.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::InvalidRequest(
            "currency must be a 3-letter code".to_string(),
        ));
    }

    let account = AccountStore::new(state.pool.clone())
        .create(request.user_id, &currency)
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, AppError> {
    let account = AccountStore::new(state.pool.clone())
        .get(account_id)
        .await?
        .ok_or(DomainError::AccountNotFound(account_id))?;

    Ok(Json(account))
}

async fn list_user_accounts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Account>>, AppError> {
    let accounts = AccountStore::new(state.pool.clone())
        .list_by_user(user_id)
        .await?;

    Ok(Json(accounts))
}

// =========================================================================
// Transfers
// =========================================================================

async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<Transfer>), AppError> {
    let amount: Amount = request
        .amount
        .parse()
        .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

    let transfer = state
        .transfer_engine()
        .transfer(
            request.from_account_id,
            request.to_account_id,
            &amount,
            request.description.as_deref().unwrap_or("Transfer"),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(transfer)))
}

async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<Transfer>, AppError> {
    let transfer = state.transfer_engine().get(transfer_id).await?;

    Ok(Json(transfer))
}

async fn account_transfers(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<Transfer>>, AppError> {
    let transfers = state.transfer_engine().history(account_id).await?;

    Ok(Json(transfers))
}

// =========================================================================
// Credits
// =========================================================================

async fn issue_credit(
    State(state): State<AppState>,
    Json(request): Json<IssueCreditRequest>,
) -> Result<(StatusCode, Json<Credit>), AppError> {
    let principal: Amount = request
        .principal
        .parse()
        .map_err(|e| AppError::InvalidRequest(format!("Invalid principal: {}", e)))?;

    let credit = state
        .credit_ledger()
        .issue_credit(request.user_id, &principal, request.term_months)
        .await?;

    Ok((StatusCode::CREATED, Json(credit)))
}

async fn get_credit(
    State(state): State<AppState>,
    Path(credit_id): Path<Uuid>,
) -> Result<Json<Credit>, AppError> {
    let credit = state.credit_ledger().get_credit(credit_id).await?;

    Ok(Json(credit))
}

async fn list_user_credits(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Credit>>, AppError> {
    let credits = state.credit_ledger().list_by_user(user_id).await?;

    Ok(Json(credits))
}

async fn credit_schedule(
    State(state): State<AppState>,
    Path(credit_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentScheduleEntry>>, AppError> {
    let schedule = state.credit_ledger().schedule(credit_id).await?;

    Ok(Json(schedule))
}

async fn credit_payments(
    State(state): State<AppState>,
    Path(credit_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state.credit_ledger().payments(credit_id).await?;

    Ok(Json(payments))
}

async fn apply_payment(
    State(state): State<AppState>,
    Path(credit_id): Path<Uuid>,
    Json(request): Json<ApplyPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let amount: Amount = request
        .amount
        .parse()
        .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

    let payment = state
        .credit_ledger()
        .apply_payment(credit_id, &amount)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

// =========================================================================
// Analytics
// =========================================================================

async fn forecast(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<Vec<BalancePoint>>, AppError> {
    if query.days == 0 || query.days > 365 {
        return Err(AppError::InvalidRequest(
            "days must be between 1 and 365".to_string(),
        ));
    }

    let points = state
        .forecast_engine()
        .forecast_balance(user_id, query.days)
        .await?;

    Ok(Json(points))
}

async fn income_expense(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<IncomeExpense>, AppError> {
    if query.start > query.end {
        return Err(AppError::InvalidRequest(
            "start must not be after end".to_string(),
        ));
    }

    let stats = state
        .forecast_engine()
        .income_expense(user_id, query.start, query.end)
        .await?;

    Ok(Json(stats))
}

async fn monthly_stats(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<YearQuery>,
) -> Result<Json<Vec<MonthlyStats>>, AppError> {
    let stats = state
        .forecast_engine()
        .monthly_stats(user_id, query.year)
        .await?;

    Ok(Json(stats))
}

async fn credit_load(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CreditLoad>, AppError> {
    let load = state.forecast_engine().credit_load(user_id).await?;

    Ok(Json(load))
}
