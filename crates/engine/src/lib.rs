//! Ledger consistency engine for a personal finance tracker.
//!
//! Owns every mutation of wallets, transactions and categories, and keeps the
//! wallet invariant (`balance == initial_balance` plus the signed sum of the
//! wallet's transactions) true after each commit. Concurrency is optimistic:
//! balance writes are guarded by a per-wallet revision and conflicting
//! attempts are re-executed transparently.

pub use balance::signed_delta;
pub use categories::{Category, CategoryKind};
pub use error::LedgerError;
pub use feed::{Snapshot, SnapshotFeed};
pub use ops::{
    CategoryRef, CreateCategoryCmd, CreateTransactionCmd, CreateTransferCmd, CreateWalletCmd,
    Engine, EngineBuilder, SignupCmd, Suggestion, TransactionRef, UpdateCategoryCmd,
    UpdatePreferencesCmd, UpdateTransactionCmd, UpdateTransferCmd, UpdateWalletCmd,
    accept_suggestions,
};
pub use transactions::{Transaction, TransactionKind};
pub use users::Profile;
pub use wallets::{Wallet, WalletKind};

mod balance;
mod categories;
mod error;
mod feed;
mod ops;
mod transactions;
mod users;
mod wallets;

pub type ResultLedger<T> = Result<T, LedgerError>;
