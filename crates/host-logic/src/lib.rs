/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Command-level logic of the cadence lockstep host.

The crate owns everything between the datagram framing and the
application: parties and their quality bookkeeping, the participants
registry, the authoritative step composer, the range selection for step
replies and the snapshot download channel. The framing itself (connection
secrets, ordered datagrams, client time) lives in `cadence-host`.
*/

pub mod combiner;
pub mod connection;
pub mod err;
pub mod forced;
pub mod id_ring;
pub mod logic;
pub mod parties;
pub mod participants;
pub mod party;
pub mod quality;
pub mod ranges;
pub mod session;

pub use crate::err::HostLogicError;
pub use crate::logic::{HostLogic, HostLogicConfig, SharedRandom};
use tick_id::TickId;

/// Application callback that serializes the current authoritative game
/// state for snapshot downloads.
pub trait GameStateProvider {
    fn state(&self, tick_id: TickId) -> (TickId, Vec<u8>);
}
