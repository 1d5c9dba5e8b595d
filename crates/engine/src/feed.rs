//! Live read feeds: lazy, infinite, restartable sequences of full-collection
//! snapshots keyed by owner id.
//!
//! Every committed mutation bumps a shared `watch` counter; a feed's `recv`
//! yields the current snapshot immediately on first call and then once per
//! observed change. The ledger operations never depend on a feed being
//! polled, and a dropped feed can simply be recreated.

use sea_orm::{DatabaseConnection, QueryFilter, QueryOrder, prelude::*};
use tokio::sync::watch;

use crate::{
    Category, LedgerError, Profile, ResultLedger, Transaction, Wallet, categories, transactions,
    users, wallets,
};

use crate::ops::Engine;

#[derive(Debug)]
pub(crate) struct ChangeFeed {
    tx: watch::Sender<u64>,
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Record that some collection changed. Never fails: the sender keeps
    /// the channel alive even with no subscribers.
    pub(crate) fn mark(&self) {
        self.tx.send_modify(|version| *version = version.wrapping_add(1));
    }

    pub(crate) fn watch(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// Loads one user's view of a collection; implemented per snapshot type.
pub trait Snapshot: Sized {
    fn load(
        db: &DatabaseConnection,
        user_id: &str,
    ) -> impl Future<Output = ResultLedger<Vec<Self>>> + Send;
}

impl Snapshot for Wallet {
    async fn load(db: &DatabaseConnection, user_id: &str) -> ResultLedger<Vec<Self>> {
        let models = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .order_by_asc(wallets::Column::Kind)
            .order_by_asc(wallets::Column::DisplayOrder)
            .all(db)
            .await?;
        models.into_iter().map(Wallet::try_from).collect()
    }
}

impl Snapshot for Transaction {
    async fn load(db: &DatabaseConnection, user_id: &str) -> ResultLedger<Vec<Self>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt)
            .all(db)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }
}

impl Snapshot for Category {
    async fn load(db: &DatabaseConnection, user_id: &str) -> ResultLedger<Vec<Self>> {
        let models = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::Kind)
            .order_by_asc(categories::Column::DisplayOrder)
            .all(db)
            .await?;
        models.into_iter().map(Category::try_from).collect()
    }
}

impl Snapshot for Profile {
    async fn load(db: &DatabaseConnection, user_id: &str) -> ResultLedger<Vec<Self>> {
        let model = users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::NotFound("user not exists".to_string()))?;
        Ok(vec![Profile::try_from(model)?])
    }
}

/// A restartable stream of full snapshots for one user and one collection.
#[derive(Debug)]
pub struct SnapshotFeed<T> {
    database: DatabaseConnection,
    user_id: String,
    rx: watch::Receiver<u64>,
    primed: bool,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Snapshot> SnapshotFeed<T> {
    fn new(database: DatabaseConnection, user_id: String, rx: watch::Receiver<u64>) -> Self {
        Self {
            database,
            user_id,
            rx,
            primed: false,
            _marker: std::marker::PhantomData,
        }
    }

    /// Next full snapshot: immediate on the first call, then after each
    /// committed mutation.
    pub async fn recv(&mut self) -> ResultLedger<Vec<T>> {
        if self.primed {
            self.rx.changed().await.map_err(|_| {
                LedgerError::StoreUnavailable("change feed closed".to_string())
            })?;
        } else {
            self.rx.mark_unchanged();
            self.primed = true;
        }
        T::load(&self.database, &self.user_id).await
    }
}

impl Engine {
    pub fn watch_wallets(&self, user_id: &str) -> SnapshotFeed<Wallet> {
        SnapshotFeed::new(
            self.database().clone(),
            user_id.to_string(),
            self.feed().watch(),
        )
    }

    pub fn watch_transactions(&self, user_id: &str) -> SnapshotFeed<Transaction> {
        SnapshotFeed::new(
            self.database().clone(),
            user_id.to_string(),
            self.feed().watch(),
        )
    }

    pub fn watch_categories(&self, user_id: &str) -> SnapshotFeed<Category> {
        SnapshotFeed::new(
            self.database().clone(),
            user_id.to_string(),
            self.feed().watch(),
        )
    }

    pub fn watch_profile(&self, user_id: &str) -> SnapshotFeed<Profile> {
        SnapshotFeed::new(
            self.database().clone(),
            user_id.to_string(),
            self.feed().watch(),
        )
    }
}
