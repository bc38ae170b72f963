/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Per-connection command handlers: join, predicted steps, snapshot download
and the blob acks that drive it.
*/

use crate::combiner;
use crate::err::HostLogicError;
use crate::forced::insert_forced_steps;
use crate::party::{LocalParty, PartyState};
use crate::ranges::{collect_ranges, pending_ranges};
use crate::session::GameSession;
use crate::GameStateProvider;
use cadence_blob_stream::out_logic_front::OutLogicFront;
use cadence_blob_stream::prelude::{ReceiverToSenderFrontCommands, TransferId};
use cadence_participant::PartyId;
use cadence_protocol::client_to_host::{DownloadGameStateRequest, JoinGameRequest, StepsRequest};
use cadence_protocol::host_to_client::{
    DownloadGameStateResponse, GameStepResponse, GameStepResponseHeader, HostToClientCommands,
    JoinGameAccepted, JoinGameParticipant, JoinGameParticipants, JoinGameRefused, PartyAndSecret,
};
use cadence_protocol::prelude::AuthoritativeStepRanges;
use cadence_protocol::PartySecret;
use cadence_secure_random::SecureRandom;
use cadence_step::Step;
use cadence_step_map::StepMap;
use flood_rs::{Deserialize, Serialize};
use log::{debug, trace, warn};
use monotonic_time_rs::Millis;
use std::fmt::{Debug, Display};
use std::time::Duration;
use tick_id::TickId;

/// Chunk size for snapshot downloads. One chunk fits a datagram.
pub const BLOB_STREAM_CHUNK_SIZE: u16 = 1024;
const BLOB_RESEND_DURATION: Duration = Duration::from_millis(32 * 3);

/// A client whose step stream skips further ahead than this has diverged
/// beyond repair and must resync via snapshot.
pub const MAX_DROPPED_GAP: usize = 60;

/// Snapshot staged for one downloading connection.
#[derive(Debug, Clone)]
pub struct GameStateSnapshot {
    pub tick_id: TickId,
    pub octets: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Phase {
    WaitingForValidConnectRequest,
    Connected,
}

/// Logic-level state for one transport connection.
#[derive(Debug)]
pub struct Connection<StepT: Clone> {
    pub phase: Phase,
    pub transport_id: u8,
    pub party_id: Option<PartyId>,
    pub out_blob_stream: Option<OutLogicFront>,
    pub blob_client_request_id: Option<u8>,
    next_blob_channel: u16,
    pub staged_state: Option<GameStateSnapshot>,
    phantom: std::marker::PhantomData<StepT>,
}

impl<StepT: Clone + Debug + Eq + Serialize + Deserialize + Display> Connection<StepT> {
    #[must_use]
    pub fn new(transport_id: u8) -> Self {
        Self {
            phase: Phase::WaitingForValidConnectRequest,
            transport_id,
            party_id: None,
            out_blob_stream: None,
            blob_client_request_id: None,
            next_blob_channel: 0,
            staged_state: None,
            phantom: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn is_state_received_by_remote(&self) -> bool {
        self.out_blob_stream
            .as_ref()
            .map_or(false, OutLogicFront::is_received_by_remote)
    }

    /// Validates the application version and opens the connection for
    /// session commands. The connect reply itself is framed by the host
    /// layer, which owns the connection id and secret.
    pub fn on_connect(
        &mut self,
        client_application_version: cadence_protocol::Version,
        required_application_version: &app_version::Version,
    ) -> Result<(), HostLogicError> {
        let client_version = app_version::Version::new(
            client_application_version.major,
            client_application_version.minor,
            client_application_version.patch,
        );
        if client_version != *required_application_version {
            return Err(HostLogicError::WrongApplicationVersion);
        }
        self.phase = Phase::Connected;
        Ok(())
    }

    fn join_accepted(
        session: &GameSession<StepT>,
        party_id: PartyId,
        secret: PartySecret,
        request: &JoinGameRequest,
    ) -> HostToClientCommands<Step<StepT>> {
        let party = session.parties.get(party_id).expect("party exists");
        let participants = party
            .participant_ids
            .iter()
            .map(|id| {
                let participant = session
                    .participants
                    .get(*id)
                    .expect("party references live participants");
                JoinGameParticipant {
                    local_index: participant.local_index,
                    participant_id: participant.id,
                }
            })
            .collect();

        HostToClientCommands::JoinGame(JoinGameAccepted {
            client_request_id: request.client_request_id,
            party_and_secret: PartyAndSecret {
                party_id,
                secret,
            },
            participants: JoinGameParticipants(participants),
        })
    }

    /// Handles all three join kinds, falling back to a fresh party when a
    /// secret or migration lookup finds nothing.
    pub fn on_join(
        &mut self,
        session: &mut GameSession<StepT>,
        random: &mut dyn SecureRandom,
        waiting_for_rejoin_max_ticks: usize,
        max_participants_per_connection: usize,
        request: &JoinGameRequest,
    ) -> Result<HostToClientCommands<Step<StepT>>, HostLogicError> {
        debug!("on_join {request:?}");

        let player_count = request.player_requests.players.len();
        if player_count == 0 || player_count > max_participants_per_connection {
            return Err(HostLogicError::WrongLocalPlayerCount {
                expected: max_participants_per_connection,
                requested: player_count,
            });
        }

        // A repeated join over the same connection is answered with the
        // seat it already has.
        if let Some(party_id) = self.party_id {
            if let Some(party) = session.parties.get(party_id) {
                debug!("connection already seated in {party_id}, resending join info");
                let secret = party.secret;
                return Ok(Self::join_accepted(session, party_id, secret, request));
            }
            self.party_id = None;
        }

        let current_tick = session.tick_id_to_produce();

        let rejoin_party_id = match request.join_kind {
            cadence_protocol::client_to_host::JoinGameKind::NoSecret => None,
            cadence_protocol::client_to_host::JoinGameKind::PartySecret(secret) => {
                let found = session.parties.find_by_secret(secret);
                if found.is_none() {
                    debug!("no party with that secret, probably timed out. creating a fresh one");
                }
                found
            }
            cadence_protocol::client_to_host::JoinGameKind::HostMigrationParticipantId(id) => {
                let found = session.parties.find_waiting_by_participant(id);
                if found.is_none() {
                    debug!(
                        "no prepared party for {id} after host migration. creating a fresh one"
                    );
                }
                found
            }
        };

        if let Some(party_id) = rejoin_party_id {
            let party = session
                .parties
                .get_mut(party_id)
                .expect("lookup returned a live party");
            if party.participant_ids.len() != player_count {
                debug!("{party_id}: rejoin refused, wrong local player count");
                return Err(HostLogicError::WrongLocalPlayerCount {
                    expected: party.participant_ids.len(),
                    requested: player_count,
                });
            }

            party.rejoin(self.transport_id, current_tick);
            party.waiting_for_rejoin_max = waiting_for_rejoin_max_ticks;
            let secret = party.secret;
            let member_ids = party.participant_ids.clone();
            for participant_id in member_ids {
                if let Some(participant) = session.participants.get_mut(participant_id) {
                    participant.incoming_steps.reinit(current_tick);
                }
            }
            self.party_id = Some(party_id);
            return Ok(Self::join_accepted(session, party_id, secret, request));
        }

        // Fresh party.
        let Some(party_id) = session.parties.find_free_id() else {
            warn!("could not join, out of party slots");
            return Ok(HostToClientCommands::JoinGameOutOfSlots(JoinGameRefused {
                client_request_id: request.client_request_id,
            }));
        };

        let local_indices: Vec<_> = request
            .player_requests
            .players
            .iter()
            .map(|p| p.local_index)
            .collect();

        let created = match session
            .participants
            .join(&local_indices, party_id, current_tick)
        {
            Ok(created) => created,
            Err(HostLogicError::SessionFull) => {
                warn!("could not join, participant pool is full");
                return Ok(HostToClientCommands::JoinGameOutOfSlots(JoinGameRefused {
                    client_request_id: request.client_request_id,
                }));
            }
            Err(other) => return Err(other),
        };

        let secret = PartySecret {
            value: random.random_u64(),
        };
        let mut party = LocalParty::new(
            party_id,
            secret,
            created,
            Some(self.transport_id),
            current_tick,
        );
        party.waiting_for_rejoin_max = waiting_for_rejoin_max_ticks;
        session.parties.insert(party)?;
        self.party_id = Some(party_id);

        debug!(
            "client joined {party_id} at {current_tick} with {player_count} local player(s)"
        );
        Ok(Self::join_accepted(session, party_id, secret, request))
    }

    /// Accepts predicted steps into the party and participant buffers,
    /// advances the authoritative timeline and answers with step ranges.
    pub fn on_steps(
        &mut self,
        session: &mut GameSession<StepT>,
        request: &StepsRequest<StepT>,
    ) -> Result<HostToClientCommands<Step<StepT>>, HostLogicError> {
        trace!("on incoming predicted steps {request}");

        let party_id = self.party_id.ok_or(HostLogicError::NoPartyForConnection)?;

        let parties = &mut session.parties;
        let participants = &mut session.participants;

        let party = parties
            .get_mut(party_id)
            .ok_or(HostLogicError::UnknownPartyId(party_id))?;

        if party.state == PartyState::Dissolved {
            party.warning_count += 1;
            if party.warning_count % 60 == 0 {
                debug!("{party_id}: ignoring steps from dissolved party");
            }
            return Err(HostLogicError::PartyIsDissolved(party_id));
        }

        let first_step_id = request.combined_predicted_steps.tick_id;

        let dropped = party.incoming_steps.dropped_count(first_step_id);
        if dropped > 0 {
            if dropped > MAX_DROPPED_GAP {
                warn!("{party_id}: dropped {dropped} steps, client must resync via snapshot");
                return Err(HostLogicError::TooManyDroppedSteps { dropped });
            }
            warn!(
                "{party_id}: dropped {dropped} steps. expected {}, incoming start {first_step_id}",
                party.incoming_steps.expected_write_tick_id()
            );
            insert_forced_steps(party, participants, dropped)?;
        }

        let mut added_step_count = 0;
        for (offset, tick_map) in request.combined_predicted_steps.steps.iter().enumerate() {
            let tick_id = first_step_id + offset as u32;
            if tick_id < party.incoming_steps.expected_write_tick_id() {
                // Stale resend from the redundancy window.
                continue;
            }

            for incoming_id in tick_map.keys() {
                if !party.has_participant(*incoming_id) {
                    return Err(HostLogicError::UnknownPartyMember(*incoming_id));
                }
            }

            let mut wrapped = StepMap::new();
            for (participant_id, step) in tick_map {
                wrapped
                    .insert(*participant_id, Step::Provided(step.clone()))
                    .expect("participant ids are unique per tick");
            }
            party.incoming_steps.push(tick_id, wrapped)?;

            for (participant_id, step) in tick_map {
                if let Some(participant) = participants.get_mut(*participant_id) {
                    if participant.incoming_steps.expected_write_tick_id() == tick_id {
                        participant
                            .incoming_steps
                            .push(tick_id, Step::Provided(step.clone()))?;
                    }
                }
            }

            added_step_count += 1;
        }

        if added_step_count > 0 {
            party.quality.added_steps_to_buffer(added_step_count);
        } else {
            party.warning_about_zero_added_steps += 1;
            if party.warning_about_zero_added_steps % 4 == 0 {
                debug!(
                    "{party_id}: got a packet with only old predicted steps, waiting for {}",
                    party.incoming_steps.expected_write_tick_id()
                );
            }
        }

        combiner::compose_all(session);

        Ok(HostToClientCommands::GameStep(self.step_response(
            session,
            party_id,
            request.ack.waiting_for_tick_id,
            request.ack.receive_mask,
        )))
    }

    fn step_response(
        &mut self,
        session: &mut GameSession<StepT>,
        party_id: PartyId,
        waiting_for_tick_id: TickId,
        receive_mask: u64,
    ) -> GameStepResponse<Step<StepT>> {
        let authoritative = &session.authoritative_steps;
        let ranges = pending_ranges(
            waiting_for_tick_id,
            authoritative.expected_read_tick_id(),
            authoritative.expected_write_tick_id(),
            receive_mask,
        );
        let combined_ranges = collect_ranges(authoritative, &ranges);
        let authoritative_write = authoritative.expected_write_tick_id();

        let header = if let Some(party) = session.parties.get_mut(party_id) {
            if combined_ranges.is_empty() {
                party.no_ranges_to_send_counter = party.no_ranges_to_send_counter.wrapping_add(1);
                if party.no_ranges_to_send_counter > 8 && party.no_ranges_to_send_counter % 20 == 0
                {
                    debug!(
                        "{party_id}: no ranges to send for {} replies, suspicious",
                        party.no_ranges_to_send_counter
                    );
                }
            } else {
                party.no_ranges_to_send_counter = 0;
            }

            let party_write = party.incoming_steps.expected_write_tick_id();
            let delta = i64::from(party_write.0) - i64::from(authoritative_write.0);
            GameStepResponseHeader {
                last_received_step_id: TickId(party_write.0.saturating_sub(1)),
                step_buffer_count: party.incoming_steps.len().min(u8::MAX as usize) as u8,
                authoritative_buffer_delta: delta.clamp(i8::MIN as i64, i8::MAX as i64) as i8,
            }
        } else {
            GameStepResponseHeader {
                last_received_step_id: TickId(0),
                step_buffer_count: 0,
                authoritative_buffer_delta: 0,
            }
        };

        GameStepResponse {
            response_header: header,
            authoritative_steps: AuthoritativeStepRanges {
                ranges: combined_ranges,
            },
        }
    }

    /// Serves a snapshot download. A repeated request id resends the same
    /// descriptor; a new one stages a fresh snapshot and opens a fresh
    /// blob channel.
    pub fn on_download(
        &mut self,
        session: &mut GameSession<StepT>,
        now: Millis,
        max_game_state_octet_count: usize,
        request: &DownloadGameStateRequest,
        state_provider: &impl GameStateProvider,
    ) -> Result<Vec<HostToClientCommands<Step<StepT>>>, HostLogicError> {
        debug!("client requested game state download {request:?}");

        let is_same_request = self.blob_client_request_id == Some(request.request_id);
        if !is_same_request {
            let (state_tick_id, octets) = state_provider.state(session.tick_id_to_produce());
            if octets.len() > max_game_state_octet_count {
                return Err(HostLogicError::GameStateTooLarge {
                    octet_count: octets.len(),
                    capacity: max_game_state_octet_count,
                });
            }
            trace!(
                "staging snapshot at {state_tick_id}, {} octets",
                octets.len()
            );

            self.next_blob_channel += 1;
            let transfer_id = TransferId(self.next_blob_channel);
            self.out_blob_stream = Some(OutLogicFront::new(
                transfer_id,
                BLOB_STREAM_CHUNK_SIZE,
                BLOB_RESEND_DURATION,
                &octets,
            )?);
            self.staged_state = Some(GameStateSnapshot {
                tick_id: state_tick_id,
                octets,
            });
            self.blob_client_request_id = Some(request.request_id);

            // The snapshot covers everything before it, so older
            // authoritative steps can leave the window.
            session.authoritative_steps.discard_up_to(state_tick_id);
        }

        let staged = self.staged_state.as_ref().ok_or(HostLogicError::NoDownloadNow)?;
        let blob_stream = self
            .out_blob_stream
            .as_mut()
            .ok_or(HostLogicError::NoDownloadNow)?;

        let mut commands = vec![HostToClientCommands::DownloadGameState(
            DownloadGameStateResponse {
                client_request: request.request_id,
                tick_id: staged.tick_id,
                blob_stream_channel: blob_stream.transfer_id().0,
            },
        )];
        commands.extend(
            blob_stream
                .send(now)?
                .into_iter()
                .map(HostToClientCommands::BlobStreamChannel),
        );
        Ok(commands)
    }

    /// Feeds a download ack into the blob stream and sends the next chunk
    /// burst. Once the remote has everything, a follow-on range reply from
    /// the snapshot tick lets the client resume lockstep.
    pub fn on_blob_ack(
        &mut self,
        session: &mut GameSession<StepT>,
        now: Millis,
        command: &ReceiverToSenderFrontCommands,
    ) -> Result<Vec<HostToClientCommands<Step<StepT>>>, HostLogicError> {
        let blob_stream = self
            .out_blob_stream
            .as_mut()
            .ok_or(HostLogicError::NoDownloadNow)?;
        blob_stream.receive(command)?;

        let mut commands: Vec<_> = blob_stream
            .send(now)?
            .into_iter()
            .map(HostToClientCommands::BlobStreamChannel)
            .collect();

        if self.is_state_received_by_remote() {
            if let (Some(staged), Some(party_id)) = (self.staged_state.clone(), self.party_id) {
                debug!(
                    "snapshot received by remote, sending ranges from {}",
                    staged.tick_id
                );
                commands.push(HostToClientCommands::GameStep(self.step_response(
                    session,
                    party_id,
                    staged.tick_id,
                    0,
                )));
            }
        }

        Ok(commands)
    }
}
