// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshots and persistence.
//!
//! A [`Snapshot`] captures one device's observed state at a point in
//! time. A [`StateStore`] keeps the last-known snapshot per device, with
//! a conditional put that preserves the monotonic `observed_at`
//! invariant under overlapping runs.

mod json_store;
mod snapshot;
mod store;

pub use json_store::JsonFileStore;
pub use snapshot::{DeviceKind, DeviceStatus, Snapshot};
pub use store::{MemoryStore, StateStore};
