/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Per-peer transport connection: the connect nonce, the secret that seeds the
datagram hash, the ordered-datagram cursors and the connection phase.
*/

use crate::err::HostError;
use crate::transport::MAX_DATAGRAM_SIZE;
use cadence_connection_layer::{verify_hash, write_to_stream, ConnectionId, ConnectionSecretSeed};
use cadence_ordered_datagram::{OrderedIn, OrderedOut};
use cadence_protocol::{ConnectionSecret, Nonce};
use flood_rs::prelude::OutOctetStream;
use flood_rs::{ReadOctetStream, WriteOctetStream};

/// Octets in front of the command payload: connection id (1), hash (4),
/// ordered sequence + marker (2), client time (2).
pub const CONNECTION_HEADER_OCTET_COUNT: usize = 5;
pub const ORDERED_AND_TIME_OCTET_COUNT: usize = 4;

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum TransportPhase {
    #[default]
    Idle,
    WaitingForValidConnect,
    Connected,
    /// A snapshot download has been staged for this connection.
    InitialStateDetermined,
    Disconnected,
}

#[derive(Debug)]
pub struct TransportConnection {
    pub id: u8,
    pub transport_index: u8,
    pub request_nonce: Nonce,
    pub secret: ConnectionSecret,
    pub use_debug_stream: bool,
    pub phase: TransportPhase,
    pub ordered_in: OrderedIn,
    pub ordered_out: OrderedOut,
}

impl TransportConnection {
    #[must_use]
    pub fn new(
        id: u8,
        transport_index: u8,
        request_nonce: Nonce,
        secret: ConnectionSecret,
        use_debug_stream: bool,
    ) -> Self {
        Self {
            id,
            transport_index,
            request_nonce,
            secret,
            use_debug_stream,
            phase: TransportPhase::Connected,
            ordered_in: OrderedIn::default(),
            ordered_out: OrderedOut::new(),
        }
    }

    #[must_use]
    pub fn hash_seed(&self) -> ConnectionSecretSeed {
        ConnectionSecretSeed(self.secret.value as u32)
    }

    /// Checks the hash the client computed with our secret. A mismatch is
    /// most likely a stale datagram from a previous incarnation.
    pub fn verify_incoming_hash(&self, hash: u32, payload: &[u8]) -> Result<(), HostError> {
        verify_hash(hash, self.hash_seed(), payload).map_err(|_| HostError::HashMismatch)
    }

    /// Reads the ordered sequence and the client time from the start of
    /// the hashed payload.
    pub fn read_ordered_and_time(
        &mut self,
        stream: &mut impl ReadOctetStream,
    ) -> Result<u16, HostError> {
        self.ordered_in.read_and_verify(stream)?;
        Ok(stream.read_u16()?)
    }

    /// Frames one outgoing datagram:
    /// `conn_id | hash | seq | 0xDD | client_time | body`. The hash covers
    /// everything after itself, which is why the inner payload is built
    /// first.
    pub fn frame_outgoing(&mut self, client_time: u16, body: &[u8]) -> Result<Vec<u8>, HostError> {
        let mut inner = OutOctetStream::new();
        self.ordered_out.to_stream(&mut inner)?;
        inner.write_u16(client_time)?;
        inner.write(body)?;

        let mut datagram_stream = OutOctetStream::new();
        write_to_stream(
            &mut datagram_stream,
            ConnectionId { value: self.id },
            self.hash_seed(),
            inner.octets_ref(),
        )?;
        datagram_stream.write(inner.octets_ref())?;

        let octet_count = datagram_stream.octets_ref().len();
        if octet_count > MAX_DATAGRAM_SIZE {
            return Err(HostError::DatagramTooLarge { octet_count });
        }

        self.ordered_out.commit();
        Ok(datagram_stream.octets_ref().to_vec())
    }
}
