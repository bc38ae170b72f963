/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Chunked, acknowledged blob transfer on top of an unreliable datagram
transport.

The host uses the out side to ship game-state snapshots to a downloading
client; the in side reassembles them. Chunks are resent until the receiver's
ack (waiting-for index plus a 64-bit receive mask) confirms them.
*/

pub mod err;
pub mod in_logic;
pub mod in_logic_front;
pub mod in_stream;
pub mod out_logic;
pub mod out_logic_front;
pub mod out_stream;
pub mod prelude;
pub mod protocol;
pub mod protocol_front;

pub type ChunkIndex = usize;
