// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON file-backed snapshot store.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::state::{Snapshot, StateStore};

/// Snapshot store writing one JSON file per device.
///
/// File names are percent-encoded from the device id, so ids containing
/// path separators or other special characters are safe. The same
/// conditional-put discipline as [`MemoryStore`](crate::state::MemoryStore)
/// applies: the stored revision is read and compared before a write.
///
/// # Examples
///
/// ```no_run
/// use genwatch_lib::state::{JsonFileStore, StateStore};
///
/// # async fn example(snapshot: genwatch_lib::state::Snapshot) -> Result<(), genwatch_lib::error::StoreError> {
/// let store = JsonFileStore::new("/var/lib/genwatch/snapshots")?;
/// store.put(&snapshot).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    directory: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    /// Returns the directory snapshots are stored under.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, device_id: &str) -> PathBuf {
        let file_name = format!("{}.json", urlencoding::encode(device_id));
        self.directory.join(file_name)
    }

    fn read_snapshot(&self, device_id: &str) -> Result<Option<Snapshot>, StoreError> {
        let path = self.path_for(device_id);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let snapshot = serde_json::from_str(&contents)?;
        Ok(Some(snapshot))
    }
}

impl StateStore for JsonFileStore {
    async fn get(&self, device_id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.read_snapshot(device_id)
    }

    async fn put(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(stored) = self.read_snapshot(&snapshot.device_id)?
            && stored.observed_at >= snapshot.observed_at
        {
            return Err(StoreError::Conflict {
                device_id: snapshot.device_id.clone(),
                stored: stored.observed_at,
                attempted: snapshot.observed_at,
            });
        }

        let path = self.path_for(&snapshot.device_id);
        let contents = serde_json::to_string_pretty(snapshot)?;

        // Write-then-rename so a crashed run never leaves a truncated file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(device_id = %snapshot.device_id, path = %path.display(), "Persisted snapshot");
        Ok(())
    }
}
