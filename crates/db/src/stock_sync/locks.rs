//! Per-stock update serialization within one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use stockroom_core::types::DbId;
use tokio::sync::OwnedMutexGuard;

type Slot = tokio::sync::Mutex<()>;

/// Keyed async locks, one per stock being updated.
///
/// Waiting for a lock holds no pooled connection. Entries are dropped once
/// no task holds or awaits them.
#[derive(Debug, Default)]
pub struct StockLocks {
    slots: Mutex<HashMap<DbId, Weak<Slot>>>,
}

/// Held for the duration of one stock update.
#[derive(Debug)]
pub struct StockUpdateGuard {
    _guard: OwnedMutexGuard<()>,
}

impl StockLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other update of `stock_id` is running.
    pub async fn lock(&self, stock_id: DbId) -> StockUpdateGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|_, slot| slot.strong_count() > 0);
            match slots.get(&stock_id).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(Slot::new(()));
                    slots.insert(stock_id, Arc::downgrade(&slot));
                    slot
                }
            }
        };
        StockUpdateGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Stocks with a running or waiting update.
    #[cfg(test)]
    fn held(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}
