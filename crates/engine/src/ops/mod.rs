use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use sea_orm::DatabaseConnection;
use tokio::sync::OwnedMutexGuard;

use crate::{EngineError, ResultEngine};

mod admins;
mod balances;
mod categories;
mod currency;
mod expenses;
mod groups;
mod members;
mod reports;

pub use admins::AdminRemoval;
pub use currency::CurrencyChange;
pub use reports::{ExportRow, SpendingReport, SpendingScope, UNCATEGORIZED};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

/// Same as `with_tx!`, holding the group's write lock until the transaction
/// is finished.
macro_rules! with_group_tx {
    ($self:expr, $group_id:expr, |$tx:ident| $body:expr) => {{
        let _guard = $self.locks.acquire($group_id).await;
        with_tx!($self, |$tx| $body)
    }};
}

pub(crate) use with_group_tx;
pub(crate) use with_tx;

/// Serializes writers of the same group.
///
/// Commits touching balances of one group never interleave; different groups
/// proceed concurrently.
#[derive(Debug, Default)]
struct GroupLocks {
    inner: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl GroupLocks {
    async fn acquire(&self, group_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map holds an idle lock.
            map.retain(|id, lock| *id == group_id || Arc::strong_count(lock) > 1);
            map.entry(group_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    locks: GroupLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            locks: GroupLocks::default(),
        })
    }
}
