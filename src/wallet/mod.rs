//! Wallet ledger: balances, immutable transaction history, and the
//! payment-gateway deposit/withdrawal flows.

mod model;
mod service;

pub use model::{
    DepositRequest, DepositResponse, ListTransactionsQuery, TransactionStatus, TransactionType,
    TxMetadata, Wallet, WalletTransaction, WithdrawRequest,
};
pub use service::WalletService;
