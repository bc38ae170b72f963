/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::combiner;
use crate::connection::{Connection, Phase};
use crate::err::HostLogicError;
use crate::party::LocalParty;
use crate::session::GameSession;
use crate::GameStateProvider;
use cadence_participant::ParticipantId;
use cadence_protocol::prelude::{ClientToHostCommands, HostToClientCommands};
use cadence_protocol::PartySecret;
use cadence_secure_random::SecureRandom;
use cadence_step::Step;
use flood_rs::{Deserialize, Serialize};
use log::{debug, info};
use monotonic_time_rs::Millis;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::rc::Rc;
use tick_id::TickId;

/// Random source shared between the host layers; connection and party
/// secrets are drawn from the same well.
pub type SharedRandom = Rc<RefCell<dyn SecureRandom>>;

/// Session-level limits, all bounded by the 64-entry id rings.
#[derive(Debug, Clone)]
pub struct HostLogicConfig {
    pub max_participant_count: usize,
    pub max_party_count: usize,
    pub max_participants_per_connection: usize,
    pub waiting_for_rejoin_max_ticks: usize,
    pub max_game_state_octet_count: usize,
}

impl Default for HostLogicConfig {
    fn default() -> Self {
        Self {
            max_participant_count: 64,
            max_party_count: 64,
            max_participants_per_connection: crate::party::MAX_LOCAL_PLAYERS,
            waiting_for_rejoin_max_ticks: crate::party::DEFAULT_WAITING_FOR_REJOIN_MAX_TICKS,
            max_game_state_octet_count: 128 * 1024,
        }
    }
}

/// Command-level host logic: owns the session and one [`Connection`] per
/// transport connection, and dispatches client commands to them.
pub struct HostLogic<StepT: Clone + Eq + Debug + Deserialize + Serialize + Display> {
    connections: HashMap<u8, Connection<StepT>>,
    session: GameSession<StepT>,
    required_application_version: app_version::Version,
    config: HostLogicConfig,
    random: SharedRandom,
}

impl<StepT: Clone + Eq + Debug + Deserialize + Serialize + Display> HostLogic<StepT> {
    #[must_use]
    pub fn new(
        tick_id: TickId,
        application_version: app_version::Version,
        config: HostLogicConfig,
        random: SharedRandom,
    ) -> Self {
        Self {
            connections: HashMap::new(),
            session: GameSession::new(
                tick_id,
                config.max_participant_count,
                config.max_party_count,
            ),
            required_application_version: application_version,
            config,
            random,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &GameSession<StepT> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession<StepT> {
        &mut self.session
    }

    /// Registers the logic side of a transport connection that the host
    /// framing layer has allocated.
    pub fn register_connection(&mut self, connection_id: u8) -> Result<(), HostLogicError> {
        if self.connections.contains_key(&connection_id) {
            return Err(HostLogicError::ConnectionIdAlreadyInUse(connection_id));
        }
        self.connections
            .insert(connection_id, Connection::new(connection_id));
        debug!("registered logic connection {connection_id}");
        Ok(())
    }

    pub fn destroy_connection(&mut self, connection_id: u8) -> Result<(), HostLogicError> {
        self.connections
            .remove(&connection_id)
            .map(|_| ())
            .ok_or(HostLogicError::UnknownConnectionId(connection_id))
    }

    #[must_use]
    pub fn get(&self, connection_id: u8) -> Option<&Connection<StepT>> {
        self.connections.get(&connection_id)
    }

    /// Dispatches one client command for `connection_id` and returns the
    /// commands to send back.
    pub fn update(
        &mut self,
        connection_id: u8,
        now: Millis,
        request: &ClientToHostCommands<StepT>,
        state_provider: &impl GameStateProvider,
    ) -> Result<Vec<HostToClientCommands<Step<StepT>>>, HostLogicError> {
        let connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(HostLogicError::UnknownConnectionId(connection_id))?;

        match connection.phase {
            Phase::Connected => match request {
                ClientToHostCommands::JoinGameType(join_request) => {
                    Ok(vec![connection.on_join(
                        &mut self.session,
                        &mut *self.random.borrow_mut(),
                        self.config.waiting_for_rejoin_max_ticks,
                        self.config.max_participants_per_connection,
                        join_request,
                    )?])
                }
                ClientToHostCommands::Steps(steps_request) => {
                    Ok(vec![connection.on_steps(&mut self.session, steps_request)?])
                }
                ClientToHostCommands::DownloadGameState(download_request) => connection.on_download(
                    &mut self.session,
                    now,
                    self.config.max_game_state_octet_count,
                    download_request,
                    state_provider,
                ),
                ClientToHostCommands::BlobStreamChannel(blob_command) => {
                    connection.on_blob_ack(&mut self.session, now, blob_command)
                }
                ClientToHostCommands::Ping(client_time) => {
                    Ok(vec![HostToClientCommands::Pong(*client_time)])
                }
                ClientToHostCommands::ConnectType(connect_request) => {
                    debug!("got a connect request on an already connected connection");
                    connection.on_connect(
                        connect_request.application_version,
                        &self.required_application_version,
                    )?;
                    Ok(vec![])
                }
            },
            Phase::WaitingForValidConnectRequest => match request {
                ClientToHostCommands::ConnectType(connect_request) => {
                    connection.on_connect(
                        connect_request.application_version,
                        &self.required_application_version,
                    )?;
                    Ok(vec![])
                }
                _ => Err(HostLogicError::NeedConnectRequestFirst),
            },
        }
    }

    /// Runs the composer outside of any command handling; useful after a
    /// batch of datagrams.
    pub fn post_update(&mut self) {
        combiner::compose_all(&mut self.session);
    }

    /// One tick for every party state machine. Parties that gave up on a
    /// rejoin are destroyed; their participants go back to the free list.
    /// Returns the transport connection ids that can be freed.
    pub fn tick(&mut self) -> Vec<u8> {
        let mut freed_transport_ids = Vec::new();

        let party_ids: Vec<_> = self.session.parties.iter().map(|party| party.id).collect();
        for party_id in party_ids {
            let keep = self
                .session
                .parties
                .get_mut(party_id)
                .map_or(true, LocalParty::tick);
            if keep {
                continue;
            }

            let party = self
                .session
                .parties
                .remove(party_id)
                .expect("party id came from the live set");
            info!("{party_id}: dissolving party");
            for participant_id in &party.participant_ids {
                if let Err(err) = self.session.participants.destroy(*participant_id) {
                    debug!("could not return {participant_id} to the pool: {err:?}");
                }
            }
            if let Some(transport_id) = party.transport_id {
                if let Some(connection) = self.connections.get_mut(&transport_id) {
                    connection.party_id = None;
                }
                freed_transport_ids.push(transport_id);
            }
        }

        freed_transport_ids
    }

    /// Prepares this host to take over an in-progress session: one party
    /// per participant id, each waiting for its old owner to reconnect.
    pub fn host_migration(
        &mut self,
        participant_ids: &[ParticipantId],
    ) -> Result<(), HostLogicError> {
        info!("preparing host for migration with {participant_ids:?}");
        self.session.parties.reset();

        let current_tick = self.session.tick_id_to_produce();
        for participant_id in participant_ids {
            let party_id = self
                .session
                .parties
                .find_free_id()
                .ok_or(HostLogicError::OutOfPartySlots)?;
            self.session
                .participants
                .prepare(*participant_id, party_id, current_tick)?;

            let secret = PartySecret {
                value: self.random.borrow_mut().random_u64(),
            };
            let mut party = LocalParty::new(party_id, secret, vec![*participant_id], None, current_tick);
            party.waiting_for_rejoin_max = self.config.waiting_for_rejoin_max_ticks;
            party.set_waiting_for_rejoin();
            self.session.parties.insert(party)?;
        }

        self.session.participants.rebuild_free_ids(participant_ids);
        Ok(())
    }
}
