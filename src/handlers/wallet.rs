//! Wallet HTTP handlers
//!
//! Endpoints for the wallet balance, transaction history, and the
//! gateway deposit/withdrawal flows including the confirmation webhook.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::error::ApiError;
use crate::gateway::GatewayEvent;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use crate::wallet::{
    DepositRequest, DepositResponse, ListTransactionsQuery, Wallet, WalletTransaction,
    WithdrawRequest,
};

/// GET /api/wallet - The caller's wallet, created lazily
pub async fn get_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Wallet>, ApiError> {
    let wallet = state.wallet_service.get_or_create(user.user_id).await?;
    Ok(Json(wallet))
}

/// POST /api/wallet/deposit - Start a gateway deposit
pub async fn deposit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<DepositRequest>,
) -> Result<(StatusCode, Json<DepositResponse>), ApiError> {
    let response = state
        .wallet_service
        .initiate_deposit(user.user_id, req.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/wallet/withdraw - Start a gateway withdrawal
pub async fn withdraw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<WalletTransaction>), ApiError> {
    let transaction = state
        .wallet_service
        .initiate_withdrawal(user.user_id, req.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /api/wallet/transactions - Paged history, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<WalletTransaction>>, ApiError> {
    let wallet = state.wallet_service.get_or_create(user.user_id).await?;
    let transactions = state
        .wallet_service
        .list_transactions(wallet.id, query.page, query.limit)
        .await?;
    Ok(Json(transactions))
}

/// POST /api/wallet/webhook - Gateway confirmation events
///
/// Authenticated with a shared secret header; fail-closed when the
/// secret is not configured.
pub async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<GatewayEvent>,
) -> Result<StatusCode, ApiError> {
    match &state.webhook_secret {
        Some(secret) if !secret.is_empty() => {
            let provided = headers
                .get("X-Webhook-Secret")
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default();
            if provided != secret {
                return Err(ApiError::Unauthorized(
                    "invalid webhook secret".to_string(),
                ));
            }
        }
        _ => {
            tracing::error!("Gateway webhook secret not configured - rejecting request");
            return Err(ApiError::ServiceUnavailable(
                "webhook endpoint is not configured".to_string(),
            ));
        }
    }

    state.wallet_service.confirm_gateway_event(&event).await?;
    Ok(StatusCode::OK)
}
