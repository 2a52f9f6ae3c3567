//! Wallet service layer - the ledger core
//!
//! Every balance mutation happens inside a database transaction that
//! holds the wallet row under `SELECT ... FOR UPDATE`, so concurrent
//! debits against the same wallet serialize and the balance check can
//! never race a stale read. Gateway-initiated deposits stay PENDING and
//! do not move the balance until the gateway confirms; withdrawals hold
//! the funds up front and release them if the gateway reports failure.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DomainError;
use crate::gateway::{GatewayClient, GatewayEvent, GatewayEventType};
use crate::wallet::{
    DepositResponse, TransactionStatus, TransactionType, TxMetadata, Wallet, WalletTransaction,
};

/// Wallet service owning balance and transaction-history invariants
#[derive(Clone)]
pub struct WalletService {
    db_pool: PgPool,
    gateway: GatewayClient,
}

impl WalletService {
    pub fn new(db_pool: PgPool, gateway: GatewayClient) -> Self {
        Self { db_pool, gateway }
    }

    /// Return the user's wallet, creating it with balance 0 on first
    /// access. Fails with NotFound if the user does not exist.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Wallet, DomainError> {
        if let Some(wallet) = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
        {
            return Ok(wallet);
        }

        let user_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.db_pool)
            .await?;
        if !user_exists {
            return Err(DomainError::NotFound("user"));
        }

        // ON CONFLICT keeps concurrent first accesses from racing the insert.
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.db_pool)
            .await?;

        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db_pool)
            .await?;

        tracing::info!(user_id = %user_id, wallet_id = %wallet.id, "Wallet ready");
        Ok(wallet)
    }

    /// Apply a signed amount to a wallet: insert a COMPLETED transaction
    /// record and move the balance, as one atomic unit. A debit that
    /// would drive the balance negative fails with InsufficientBalance
    /// and writes nothing.
    pub async fn apply_transaction(
        &self,
        wallet_id: Uuid,
        tx_type: TransactionType,
        amount: Decimal,
        description: &str,
        metadata: Option<TxMetadata>,
    ) -> Result<WalletTransaction, DomainError> {
        let mut tx = self.db_pool.begin().await?;

        let wallet = lock_wallet(&mut tx, wallet_id).await?;
        if !wallet.is_active {
            return Err(DomainError::InvalidState("wallet is deactivated".to_string()));
        }
        if amount < Decimal::ZERO && wallet.balance + amount < Decimal::ZERO {
            return Err(DomainError::InsufficientBalance);
        }

        let record = insert_transaction(
            &mut tx,
            wallet_id,
            amount,
            tx_type,
            TransactionStatus::Completed,
            description,
            None,
            metadata,
        )
        .await?;

        adjust_balance(&mut tx, wallet_id, amount).await?;
        tx.commit().await?;

        tracing::info!(
            wallet_id = %wallet_id,
            amount = %amount,
            tx_type = ?tx_type,
            "Ledger transaction applied"
        );
        Ok(record)
    }

    /// Start a gateway deposit: create the intent with the gateway and
    /// record a PENDING transaction. The balance does not move until the
    /// gateway confirms via webhook.
    pub async fn initiate_deposit(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<DepositResponse, DomainError> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "deposit amount must be positive".to_string(),
            ));
        }

        let wallet = self.get_or_create(user_id).await?;
        if !wallet.is_active {
            return Err(DomainError::InvalidState("wallet is deactivated".to_string()));
        }

        let intent = self.gateway.create_deposit(user_id, amount).await?;

        let mut tx = self.db_pool.begin().await?;
        let record = insert_transaction(
            &mut tx,
            wallet.id,
            amount,
            TransactionType::Deposit,
            TransactionStatus::Pending,
            "Wallet deposit via payment gateway",
            Some(&intent.transaction_id),
            None,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            wallet_id = %wallet.id,
            amount = %amount,
            gateway_reference = %intent.transaction_id,
            "Deposit initiated"
        );

        Ok(DepositResponse {
            transaction: record,
            payment_url: intent.payment_url,
        })
    }

    /// Start a gateway withdrawal: the funds are held (balance debited)
    /// immediately and the transaction stays PENDING until the gateway
    /// confirms. A failed payout releases the hold.
    pub async fn initiate_withdrawal(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<WalletTransaction, DomainError> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "withdrawal amount must be positive".to_string(),
            ));
        }

        let wallet = self.get_or_create(user_id).await?;
        if !wallet.is_active {
            return Err(DomainError::InvalidState("wallet is deactivated".to_string()));
        }
        if wallet.balance < amount {
            return Err(DomainError::InsufficientBalance);
        }

        let intent = self.gateway.create_withdrawal(user_id, amount).await?;

        let mut tx = self.db_pool.begin().await?;
        let locked = lock_wallet(&mut tx, wallet.id).await?;
        if locked.balance < amount {
            // Balance moved between the pre-check and the lock; the
            // gateway intent is abandoned and only logged.
            tracing::warn!(
                wallet_id = %wallet.id,
                gateway_reference = %intent.transaction_id,
                "Withdrawal intent abandoned: balance no longer sufficient"
            );
            return Err(DomainError::InsufficientBalance);
        }

        let record = insert_transaction(
            &mut tx,
            wallet.id,
            -amount,
            TransactionType::Withdrawal,
            TransactionStatus::Pending,
            "Wallet withdrawal via payment gateway",
            Some(&intent.transaction_id),
            None,
        )
        .await?;
        adjust_balance(&mut tx, wallet.id, -amount).await?;
        tx.commit().await?;

        tracing::info!(
            wallet_id = %wallet.id,
            amount = %amount,
            gateway_reference = %intent.transaction_id,
            "Withdrawal initiated, funds held"
        );
        Ok(record)
    }

    /// Map a gateway webhook event onto the matching PENDING transaction.
    /// Idempotent: a transaction already out of PENDING is left alone and
    /// `None` is returned.
    pub async fn confirm_gateway_event(
        &self,
        event: &GatewayEvent,
    ) -> Result<Option<WalletTransaction>, DomainError> {
        let mut tx = self.db_pool.begin().await?;

        let record = sqlx::query_as::<_, WalletTransaction>(
            "SELECT * FROM wallet_transactions WHERE gateway_reference = $1 AND status = 'pending' FOR UPDATE",
        )
        .bind(&event.transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            tracing::info!(
                gateway_reference = %event.transaction_id,
                event = ?event.event,
                "Gateway event ignored: no pending transaction"
            );
            return Ok(None);
        };

        // Serialize against other balance mutations on the same wallet.
        lock_wallet(&mut tx, record.wallet_id).await?;

        let new_status = match event.event {
            GatewayEventType::PaymentCompleted => {
                // Deposit confirmed: the balance moves now, not at intent
                // creation time.
                adjust_balance(&mut tx, record.wallet_id, record.amount).await?;
                TransactionStatus::Completed
            }
            GatewayEventType::PaymentFailed => TransactionStatus::Failed,
            GatewayEventType::WithdrawalCompleted => TransactionStatus::Completed,
            GatewayEventType::WithdrawalFailed => {
                // Release the hold taken at initiation.
                adjust_balance(&mut tx, record.wallet_id, -record.amount).await?;
                TransactionStatus::Failed
            }
        };

        let updated = sqlx::query_as::<_, WalletTransaction>(
            "UPDATE wallet_transactions SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(new_status)
        .bind(record.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            wallet_id = %record.wallet_id,
            gateway_reference = %event.transaction_id,
            status = ?new_status,
            "Gateway event applied"
        );
        Ok(Some(updated))
    }

    /// Transaction history, newest first
    pub async fn list_transactions(
        &self,
        wallet_id: Uuid,
        page: Option<i32>,
        limit: Option<i32>,
    ) -> Result<Vec<WalletTransaction>, DomainError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM wallets WHERE id = $1)")
            .bind(wallet_id)
            .fetch_one(&self.db_pool)
            .await?;
        if !exists {
            return Err(DomainError::NotFound("wallet"));
        }

        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let transactions = sqlx::query_as::<_, WalletTransaction>(
            "SELECT * FROM wallet_transactions WHERE wallet_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(wallet_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(transactions)
    }
}

/// Lock the wallet row for the remainder of the enclosing transaction
async fn lock_wallet(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wallet_id: Uuid,
) -> Result<Wallet, DomainError> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = $1 FOR UPDATE")
        .bind(wallet_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(DomainError::NotFound("wallet"))
}

#[allow(clippy::too_many_arguments)]
async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wallet_id: Uuid,
    amount: Decimal,
    tx_type: TransactionType,
    status: TransactionStatus,
    description: &str,
    gateway_reference: Option<&str>,
    metadata: Option<TxMetadata>,
) -> Result<WalletTransaction, DomainError> {
    let record = sqlx::query_as::<_, WalletTransaction>(
        r#"
        INSERT INTO wallet_transactions
            (wallet_id, amount, tx_type, status, description, gateway_reference, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(wallet_id)
    .bind(amount)
    .bind(tx_type)
    .bind(status)
    .bind(description)
    .bind(gateway_reference)
    .bind(metadata.map(Json))
    .fetch_one(&mut **tx)
    .await?;

    Ok(record)
}

async fn adjust_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    wallet_id: Uuid,
    delta: Decimal,
) -> Result<(), DomainError> {
    sqlx::query("UPDATE wallets SET balance = balance + $1, updated_at = now() WHERE id = $2")
        .bind(delta)
        .bind(wallet_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
