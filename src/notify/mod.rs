// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification filtering, rendering, and dispatch.

mod channel;
mod message;
mod router;

pub use channel::{ChannelOutcome, NotificationChannel};
#[cfg(feature = "http")]
pub use channel::{EmailChannel, TopicChannel};
pub use message::NotificationMessage;
pub use router::NotificationRouter;
