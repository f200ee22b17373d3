// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot persistence.
//!
//! A [`StateStore`] keeps the last-known [`Snapshot`] per device. `put` is
//! a conditional write: a snapshot whose `observed_at` is not strictly
//! newer than the stored one is rejected with
//! [`StoreError::Conflict`](crate::error::StoreError::Conflict). That
//! discipline is the only concurrency guard the pipeline relies on -
//! overlapping runs are tolerated, and the older run's stale writes
//! simply bounce.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::state::Snapshot;

/// Storage for the last-known snapshot per device.
///
/// Absence of a stored value is the normal first-observation case, not
/// an error.
#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// Retrieves the stored snapshot for a device, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying storage fails.
    async fn get(&self, device_id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Stores a snapshot, replacing the previous revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the stored revision's
    /// `observed_at` is newer than or equal to `snapshot.observed_at`;
    /// the stored revision is left untouched. Returns other `StoreError`
    /// variants if the underlying storage fails.
    async fn put(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// In-memory snapshot store.
///
/// Useful for tests and single-process deployments where snapshots do
/// not need to survive a restart.
///
/// # Examples
///
/// ```
/// use genwatch_lib::state::{MemoryStore, StateStore};
///
/// # async fn example(snapshot: genwatch_lib::state::Snapshot) {
/// let store = MemoryStore::new();
/// assert!(store.get("12345").await.unwrap().is_none());
/// store.put(&snapshot).await.unwrap();
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of devices with a stored snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    /// Returns `true` if no snapshots are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl StateStore for MemoryStore {
    async fn get(&self, device_id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.read().get(device_id).cloned())
    }

    async fn put(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write();

        if let Some(stored) = snapshots.get(&snapshot.device_id)
            && stored.observed_at >= snapshot.observed_at
        {
            return Err(StoreError::Conflict {
                device_id: snapshot.device_id.clone(),
                stored: stored.observed_at,
                attempted: snapshot.observed_at,
            });
        }

        snapshots.insert(snapshot.device_id.clone(), snapshot.clone());
        Ok(())
    }
}
