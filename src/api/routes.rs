//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountKind, AccountNumber, OperationContext, Profile, ProfileChanges};
use crate::error::AppError;
use crate::ledger::{AccountLedger, CreateAccountCommand, DepositCommand, WithdrawCommand};
use crate::query::{AccountQuery, AccountView, BalanceView, TotalBalanceView, TransactionView};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<AccountLedger>,
    pub query: Arc<AccountQuery>,
}

impl AppState {
    pub fn new(ledger: AccountLedger, query: AccountQuery) -> Self {
        Self {
            ledger: Arc::new(ledger),
            query: Arc::new(query),
        }
    }
}

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub bank_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub account_type: Option<AccountKind>,
    #[serde(default)]
    pub initial_deposit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    pub account_number: String,
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub account_number: String,
    pub amount: String,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetPinRequest {
    pub account_number: String,
    pub pin: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            name: request.name,
            address: request.address,
            phone_number: request.phone_number,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountsQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

// =========================================================================
// Request parsing
// =========================================================================

fn parse_amount(raw: &str) -> Result<Decimal, AppError> {
    raw.trim()
        .parse()
        .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))
}

fn parse_account_number(raw: &str) -> Result<AccountNumber, AppError> {
    raw.parse()
        .map_err(|e| AppError::InvalidRequest(format!("{}", e)))
}

fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{} must not be blank", field)));
    }
    Ok(())
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/accounts", post(create_account).get(list_accounts))
        .route(
            "/accounts/:account_id",
            patch(update_profile).delete(deactivate_account),
        )
        // Money movement
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/pin", post(set_pin))
        // Reads
        .route("/balance/:account_number", get(get_balance))
        .route("/transactions", get(list_all_transactions))
        .route("/transactions/:account_number", get(get_history))
        .route("/reports/total-balance", get(total_balance))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open an account
async fn create_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    require_non_blank("name", &request.name)?;

    let mut profile = Profile::new(request.name);
    profile.address = request.address;
    profile.phone_number = request.phone_number;

    let mut command = CreateAccountCommand::new(request.user_id, profile);
    if let Some(bank_id) = request.bank_id {
        command = command.with_bank(bank_id);
    }
    if let Some(pin) = request.pin {
        require_non_blank("pin", &pin)?;
        command = command.with_pin(pin);
    }
    if let Some(account_type) = request.account_type {
        command = command.with_account_type(account_type);
    }
    if let Some(initial_deposit) = request.initial_deposit {
        command = command.with_initial_deposit(parse_amount(&initial_deposit)?);
    }

    let account = state.ledger.create_account(command, &context).await?;
    let view = state.query.account_view(&account).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

// =========================================================================
// GET /accounts
// =========================================================================

/// List all accounts, or those of one owner
async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<AccountsQuery>,
) -> Result<Json<Vec<AccountView>>, AppError> {
    let accounts = match query.user_id {
        Some(user_id) => state.query.accounts_for_user(user_id).await?,
        None => state.query.list_accounts().await?,
    };
    Ok(Json(accounts))
}

// =========================================================================
// PATCH /accounts/:account_id
// =========================================================================

/// Partially update the holder profile
async fn update_profile(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<AccountView>, AppError> {
    if let Some(name) = &request.name {
        require_non_blank("name", name)?;
    }

    let account = state
        .ledger
        .update_profile(account_id, request.into(), &context)
        .await?;

    Ok(Json(state.query.account_view(&account).await?))
}

// =========================================================================
// DELETE /accounts/:account_id
// =========================================================================

/// Deactivate an account (soft close)
async fn deactivate_account(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.ledger.deactivate(account_id, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// POST /deposit, POST /withdraw
// =========================================================================

/// Credit an account
async fn deposit(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<TransactionView>, AppError> {
    let account_number = parse_account_number(&request.account_number)?;
    let amount = parse_amount(&request.amount)?;

    let mut command = DepositCommand::new(account_number, amount);
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    let record = state.ledger.deposit(command, &context).await?;
    Ok(Json(TransactionView::from(&record)))
}

/// Debit an account, verifying the PIN when one is supplied
async fn withdraw(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<TransactionView>, AppError> {
    let account_number = parse_account_number(&request.account_number)?;
    let amount = parse_amount(&request.amount)?;

    let mut command = WithdrawCommand::new(account_number, amount);
    if let Some(pin) = request.pin {
        command = command.with_pin(pin);
    }
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    let record = state.ledger.withdraw(command, &context).await?;
    Ok(Json(TransactionView::from(&record)))
}

// =========================================================================
// POST /pin
// =========================================================================

/// Replace the account PIN
async fn set_pin(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<SetPinRequest>,
) -> Result<StatusCode, AppError> {
    let account_number = parse_account_number(&request.account_number)?;
    require_non_blank("pin", &request.pin)?;

    state
        .ledger
        .set_pin(&account_number, &request.pin, &context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// GET /balance/:account_number, GET /transactions[/:account_number]
// =========================================================================

/// Current balance
async fn get_balance(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
) -> Result<Json<BalanceView>, AppError> {
    let account_number = parse_account_number(&account_number)?;
    Ok(Json(state.query.balance(&account_number).await?))
}

/// Ledger history of one account, most recent first
async fn get_history(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
) -> Result<Json<Vec<TransactionView>>, AppError> {
    let account_number = parse_account_number(&account_number)?;
    Ok(Json(state.query.history(&account_number).await?))
}

/// Ledger history across all accounts, most recent first
async fn list_all_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionView>>, AppError> {
    Ok(Json(state.query.all_transactions().await?))
}

// =========================================================================
// GET /reports/total-balance
// =========================================================================

/// Sum of balances over active accounts
async fn total_balance(
    State(state): State<AppState>,
) -> Result<Json<TotalBalanceView>, AppError> {
    let total_balance = state.query.total_active_balance().await?;
    Ok(Json(TotalBalanceView { total_balance }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 10.50 ").unwrap(), dec!(10.50));
        assert!(matches!(parse_amount("ten"), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_account_number() {
        assert!(parse_account_number("0000000001").is_ok());
        assert!(matches!(
            parse_account_number("12"),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_create_account_request_defaults() {
        let request: CreateAccountRequest = serde_json::from_value(serde_json::json!({
            "user_id": Uuid::new_v4(),
            "name": "Ada"
        }))
        .unwrap();

        assert!(request.bank_id.is_none());
        assert!(request.pin.is_none());
        assert!(request.account_type.is_none());
        assert!(request.initial_deposit.is_none());
    }

    #[test]
    fn test_update_profile_request_into_changes() {
        let request = UpdateProfileRequest {
            phone_number: Some("555-0100".to_string()),
            ..Default::default()
        };
        let changes: ProfileChanges = request.into();
        assert!(changes.name.is_none());
        assert_eq!(changes.phone_number.as_deref(), Some("555-0100"));
    }
}
