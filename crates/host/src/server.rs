/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
The server: owns the transport connections and the host logic, decodes and
frames datagrams, and runs the per-tick housekeeping.
*/

use crate::connection::{
    TransportConnection, TransportPhase, CONNECTION_HEADER_OCTET_COUNT,
};
use crate::err::HostError;
use crate::transport::{MultiTransport, MAX_DATAGRAM_SIZE};
use crate::update_quality::UpdateQuality;
use cadence_connection_layer::ConnectionLayerMode;
use cadence_host_logic::id_ring::{IdRing, ID_RING_CAPACITY};
use cadence_host_logic::{GameStateProvider, HostLogic, HostLogicConfig, SharedRandom};
use cadence_protocol::client_to_host::{ClientToHostCommands, ConnectRequest};
use cadence_protocol::host_to_client::{ConnectionAccepted, HostToClientCommands};
use cadence_protocol::{ConnectionSecret, Nonce};
use cadence_step::Step;
use datagram_chunker::DatagramChunker;
use err_rs::ErrorLevelProvider;
use flood_rs::prelude::{InOctetStream, OutOctetStream};
use flood_rs::{Deserialize, Serialize, WriteOctetStream};
use hexify::format_hex;
use log::{debug, trace, warn};
use monotonic_time_rs::Millis;
use std::fmt::{Debug, Display};
use tick_id::TickId;

/// Most datagrams drained from the transport in one `update`.
const MAX_DATAGRAMS_PER_TICK: usize = 64;

/// Room left for command payload per datagram once the header is paid for.
const DATAGRAM_BODY_BUDGET: usize =
    MAX_DATAGRAM_SIZE - CONNECTION_HEADER_OCTET_COUNT - crate::connection::ORDERED_AND_TIME_OCTET_COUNT;

/// Everything the embedder decides up front. All counts are bounded by the
/// 64-entry id rings.
#[derive(Debug, Clone)]
pub struct HostSetup {
    pub application_version: app_version::Version,
    pub max_connection_count: usize,
    pub max_participant_count: usize,
    pub max_participants_per_connection: usize,
    pub max_single_participant_step_octet_count: usize,
    pub max_game_state_octet_count: usize,
    pub max_waiting_for_rejoin_ticks: usize,
    pub target_tick_time_ms: u64,
}

pub struct Server<StepT: Clone + Eq + Debug + Deserialize + Serialize + Display> {
    transport_connections: Vec<Option<TransportConnection>>,
    free_transport_ids: IdRing,
    logic: HostLogic<StepT>,
    update_quality: UpdateQuality,
    setup: HostSetup,
    random: SharedRandom,
    session_secret: u64,
    stats_counter: u32,
}

impl<StepT: Clone + Eq + Debug + Deserialize + Serialize + Display> Server<StepT> {
    /// Validates the setup and pre-allocates every pool. Connection id 0
    /// is reserved for out-of-band traffic.
    pub fn new(
        setup: HostSetup,
        tick_id: TickId,
        random: SharedRandom,
    ) -> Result<Self, HostError> {
        if setup.max_connection_count == 0 || setup.max_connection_count > ID_RING_CAPACITY {
            return Err(HostError::InvalidSetup("illegal max_connection_count"));
        }
        if setup.max_participant_count == 0 || setup.max_participant_count > ID_RING_CAPACITY {
            return Err(HostError::InvalidSetup("illegal max_participant_count"));
        }
        if setup.max_single_participant_step_octet_count > DATAGRAM_BODY_BUDGET {
            return Err(HostError::InvalidSetup(
                "single participant step does not fit a datagram",
            ));
        }

        let logic_config = HostLogicConfig {
            max_participant_count: setup.max_participant_count,
            max_party_count: setup.max_connection_count,
            max_participants_per_connection: setup.max_participants_per_connection,
            waiting_for_rejoin_max_ticks: setup.max_waiting_for_rejoin_ticks,
            max_game_state_octet_count: setup.max_game_state_octet_count,
        };

        let mut transport_connections = Vec::with_capacity(setup.max_connection_count);
        transport_connections.resize_with(setup.max_connection_count, || None);

        let session_secret = random.borrow_mut().random_u64();

        Ok(Self {
            transport_connections,
            // Id 0 is the out-of-band id and never allocated.
            free_transport_ids: IdRing::with_range(1, setup.max_connection_count - 1),
            logic: HostLogic::new(
                tick_id,
                setup.application_version,
                logic_config,
                random.clone(),
            ),
            update_quality: UpdateQuality::new(setup.target_tick_time_ms),
            setup,
            random,
            session_secret,
            stats_counter: 0,
        })
    }

    #[must_use]
    pub const fn logic(&self) -> &HostLogic<StepT> {
        &self.logic
    }

    pub fn logic_mut(&mut self) -> &mut HostLogic<StepT> {
        &mut self.logic
    }

    #[must_use]
    pub const fn session_secret(&self) -> u64 {
        self.session_secret
    }

    #[must_use]
    pub fn connection(&self, connection_id: u8) -> Option<&TransportConnection> {
        self.transport_connections
            .get(connection_id as usize)
            .and_then(Option::as_ref)
    }

    /// Prepares this server to take over a session from a vanished host.
    pub fn host_migration(
        &mut self,
        participant_ids: &[cadence_participant::ParticipantId],
    ) -> Result<(), HostError> {
        self.logic.host_migration(participant_ids)?;
        Ok(())
    }

    /// One server tick: watch the tick cadence, run the party state
    /// machines, then drain and answer incoming datagrams.
    pub fn update(
        &mut self,
        now: Millis,
        transport: &mut impl MultiTransport,
        state_provider: &impl GameStateProvider,
    ) -> Result<(), HostError> {
        self.update_quality.tick(now)?;

        for freed_transport_id in self.logic.tick() {
            self.release_transport_connection(freed_transport_id);
        }

        for drained in 0..MAX_DATAGRAMS_PER_TICK {
            let Some((transport_index, datagram)) = transport.receive() else {
                if drained > 10 {
                    debug!("high number of datagrams in one tick: {drained}");
                }
                break;
            };

            let result = self.feed(now, transport_index, &datagram, &mut |octets| {
                transport.send_to(transport_index, octets);
            }, state_provider);

            if let Err(err) = result {
                if err.is_external() {
                    trace!("dropped datagram from transport {transport_index}: {err:?}");
                } else {
                    warn!(
                        "error ({:?}) handling datagram from transport {transport_index}: {err:?}",
                        err.error_level()
                    );
                }
            }
        }

        self.logic.post_update();

        self.stats_counter = self.stats_counter.wrapping_add(1);
        if self.stats_counter % 3000 == 0 {
            debug!(
                "authoritative tip at {}",
                self.logic.session().tick_id_to_produce()
            );
        }

        Ok(())
    }

    /// Handles one incoming datagram and sends any replies through `send`.
    pub fn feed(
        &mut self,
        now: Millis,
        transport_index: u8,
        datagram: &[u8],
        send: &mut dyn FnMut(&[u8]),
        state_provider: &impl GameStateProvider,
    ) -> Result<(), HostError> {
        trace!(
            "feed from transport {transport_index}:\n{}",
            format_hex(datagram)
        );

        let mut header_stream = InOctetStream::new(datagram);
        let layer = ConnectionLayerMode::from_stream(&mut header_stream)?;

        match layer {
            ConnectionLayerMode::OutOfBand => {
                self.feed_out_of_band(now, transport_index, &datagram[1..], send, state_provider)
            }
            ConnectionLayerMode::Connection(layer) => {
                let payload = &datagram[CONNECTION_HEADER_OCTET_COUNT..];
                self.feed_connection(
                    now,
                    transport_index,
                    layer.connection_id.value,
                    layer.murmur3_hash,
                    payload,
                    send,
                    state_provider,
                )
            }
        }
    }

    fn feed_out_of_band(
        &mut self,
        now: Millis,
        transport_index: u8,
        body: &[u8],
        send: &mut dyn FnMut(&[u8]),
        state_provider: &impl GameStateProvider,
    ) -> Result<(), HostError> {
        let mut stream = InOctetStream::new(body);
        let command = ClientToHostCommands::<StepT>::deserialize(&mut stream)?;
        let ClientToHostCommands::ConnectType(connect_request) = command else {
            debug!("received unknown out-of-band command, ignoring");
            return Err(HostError::UnexpectedOutOfBandCommand);
        };

        let accepted = self.on_connect_request(now, transport_index, &connect_request, state_provider)?;

        let mut out = OutOctetStream::new();
        // Out-of-band replies carry the zero connection id and no hash.
        out.write_u8(0)?;
        HostToClientCommands::<Step<StepT>>::ConnectType(accepted).serialize(&mut out)?;

        let octets = out.octets_ref();
        if octets.len() > MAX_DATAGRAM_SIZE {
            return Err(HostError::DatagramTooLarge {
                octet_count: octets.len(),
            });
        }
        send(octets);
        Ok(())
    }

    /// Connect requests are idempotent on `(transport_index, nonce)`: a
    /// re-sent request gets the identical connection id and secret back.
    fn on_connect_request(
        &mut self,
        now: Millis,
        transport_index: u8,
        request: &ConnectRequest,
        state_provider: &impl GameStateProvider,
    ) -> Result<ConnectionAccepted, HostError> {
        let client_version = app_version::Version::new(
            request.application_version.major,
            request.application_version.minor,
            request.application_version.patch,
        );
        if client_version != self.setup.application_version {
            warn!("connect with wrong application version {client_version:?}");
            return Err(HostError::Logic(
                cadence_host_logic::HostLogicError::WrongApplicationVersion,
            ));
        }

        let existing = self.find_connect_request(transport_index, request.nonce);
        let connection_id = match existing {
            Some(connection_id) => {
                debug!("returning existing connection {connection_id} for repeated connect");
                connection_id
            }
            None => {
                debug!("request for a new connection from transport {transport_index}");
                let connection_id = self
                    .free_transport_ids
                    .pop()
                    .map_err(|_| HostError::NoFreeTransportConnections)?;
                let secret = ConnectionSecret {
                    value: self.random.borrow_mut().random_u64(),
                };
                let mut connection = TransportConnection::new(
                    connection_id,
                    transport_index,
                    request.nonce,
                    secret,
                    request.use_debug_stream,
                );
                connection.phase = TransportPhase::Connected;
                self.transport_connections[connection_id as usize] = Some(connection);

                self.logic.destroy_connection(connection_id).ok();
                self.logic.register_connection(connection_id)?;
                // Runs the logic-side connect so the connection accepts
                // session commands from here on.
                self.logic.update(
                    connection_id,
                    now,
                    &ClientToHostCommands::ConnectType(*request),
                    state_provider,
                )?;
                connection_id
            }
        };

        let connection = self
            .connection(connection_id)
            .expect("connection was just looked up or created");
        Ok(ConnectionAccepted {
            use_debug_stream: connection.use_debug_stream,
            connection_id,
            connection_secret: connection.secret,
        })
    }

    fn find_connect_request(&self, transport_index: u8, nonce: Nonce) -> Option<u8> {
        self.transport_connections
            .iter()
            .flatten()
            .find(|connection| {
                connection.phase != TransportPhase::Disconnected
                    && connection.transport_index == transport_index
                    && connection.request_nonce == nonce
            })
            .map(|connection| connection.id)
    }

    #[allow(clippy::too_many_arguments)]
    fn feed_connection(
        &mut self,
        now: Millis,
        transport_index: u8,
        connection_id: u8,
        hash: u32,
        payload: &[u8],
        send: &mut dyn FnMut(&[u8]),
        state_provider: &impl GameStateProvider,
    ) -> Result<(), HostError> {
        let connection = self
            .transport_connections
            .get_mut(connection_id as usize)
            .and_then(Option::as_mut)
            .ok_or(HostError::ConnectionNotFound(connection_id))?;

        if connection.phase == TransportPhase::Disconnected {
            return Err(HostError::ConnectionDisconnected(connection_id));
        }
        if connection.transport_index != transport_index {
            return Err(HostError::WrongTransportIndex {
                expected: connection.transport_index,
                received: transport_index,
            });
        }

        connection.verify_incoming_hash(hash, payload)?;

        let mut stream = InOctetStream::new(payload);
        let client_time = connection.read_ordered_and_time(&mut stream)?;

        let body = &payload[crate::connection::ORDERED_AND_TIME_OCTET_COUNT..];
        let commands = datagram_chunker::deserialize_datagram::<ClientToHostCommands<StepT>>(body)?;

        let mut commands_to_send = Vec::new();
        let mut state_was_staged = false;
        for command in commands {
            if matches!(command, ClientToHostCommands::DownloadGameState(_)) {
                state_was_staged = true;
            }
            commands_to_send.extend(self.logic.update(connection_id, now, &command, state_provider)?);
        }

        let connection = self
            .transport_connections
            .get_mut(connection_id as usize)
            .and_then(Option::as_mut)
            .expect("connection looked up above");
        if state_was_staged && connection.phase == TransportPhase::Connected {
            connection.phase = TransportPhase::InitialStateDetermined;
        }

        let mut chunker = DatagramChunker::new(DATAGRAM_BODY_BUDGET);
        for command in commands_to_send {
            let mut out = OutOctetStream::new();
            command.serialize(&mut out)?;
            chunker.push(out.octets_ref())?;
        }

        for body in chunker.finalize() {
            match connection.frame_outgoing(client_time, &body) {
                Ok(datagram) => {
                    trace!("replying to {connection_id}:\n{}", format_hex(&datagram));
                    send(&datagram);
                }
                Err(err) => {
                    warn!("discarding oversized reply datagram: {err:?}");
                }
            }
        }

        Ok(())
    }

    fn release_transport_connection(&mut self, connection_id: u8) {
        debug!("releasing transport connection {connection_id}");
        if let Some(connection) = self
            .transport_connections
            .get_mut(connection_id as usize)
            .and_then(Option::as_mut)
        {
            connection.phase = TransportPhase::Disconnected;
        }
        self.logic.destroy_connection(connection_id).ok();
        self.free_transport_ids.push(connection_id).ok();
    }
}
