/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
The transport boundary. The host never touches sockets; the embedder hands
it something that can send to and receive from a set of peers addressed by
a transport index.
*/

/// Largest datagram the host ever sends or accepts. Anything bigger
/// outgoing is dropped with an error.
pub const MAX_DATAGRAM_SIZE: usize = 1200;

/// Unreliable, unordered datagram transport multiplexing several peers.
/// `receive` must be non-blocking.
pub trait MultiTransport {
    fn send_to(&mut self, transport_index: u8, octets: &[u8]);
    fn receive(&mut self) -> Option<(u8, Vec<u8>)>;
}
