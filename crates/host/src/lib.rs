/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
# Cadence Host

Datagram-facing side of the cadence lockstep host. It owns the transport
connections (secrets, ordered datagram cursors, connection phases), frames
and verifies every datagram, and drives `cadence-host-logic` from a
single-threaded tick loop.

- **Connection establishment**: nonce-idempotent out-of-band connect with a
  random per-connection secret.
- **Framing**: `conn_id | hash | seq | 0xDD | client_time | commands`,
  split over 1200-octet datagrams.
- **Tick loop**: tick-cadence watchdog, party sweep, bounded datagram
  drain.
*/

pub mod connection;
pub mod err;
pub mod prelude;
pub mod server;
pub mod transport;
pub mod update_quality;

pub use crate::err::HostError;
pub use crate::server::{HostSetup, Server};
pub use crate::transport::{MultiTransport, MAX_DATAGRAM_SIZE};
