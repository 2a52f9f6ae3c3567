//! Wallet and ledger models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Open key-value metadata attached to a transaction record
pub type TxMetadata = HashMap<String, serde_json::Value>;

/// Wallet model
///
/// `balance` is never set directly; it only moves when a transaction is
/// applied, and always equals the sum of COMPLETED transaction amounts
/// (minus any pending withdrawal holds).
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry. Amount and description are immutable after insert;
/// only `status` transitions.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub description: String,
    pub gateway_reference: Option<String>,
    pub metadata: Option<Json<TxMetadata>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transaction kinds
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Payment,
    Refund,
    PriorityFee,
    PromotionFee,
    Commission,
    Bonus,
}

/// Transaction lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

/// Request DTO for initiating a gateway deposit
#[derive(Debug, Deserialize, Validate)]
pub struct DepositRequest {
    pub amount: Decimal,
}

/// Request DTO for initiating a gateway withdrawal
#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    pub amount: Decimal,
}

/// Response DTO for a deposit intent
#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub transaction: WalletTransaction,
    pub payment_url: String,
}

/// Query parameters for the transaction history
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
