/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
A local party is one client's seat: up to eight participants, a buffer of
the combined predicted steps the client has delivered, and the quality
bookkeeping that decides when the seat is torn down.
*/

use crate::quality::{ConnectionQuality, DelayedQuality};
use cadence_participant::{ParticipantId, PartyId};
use cadence_protocol::PartySecret;
use cadence_step::Step;
use cadence_step_map::StepMap;
use cadence_steps::StepBuffer;
use log::debug;
use tick_id::TickId;

/// Most participants one party can hold (local multiplayer).
pub const MAX_LOCAL_PLAYERS: usize = 8;

/// Default reconnect window in ticks.
pub const DEFAULT_WAITING_FOR_REJOIN_MAX_TICKS: usize = 62 * 20;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PartyState {
    Normal,
    WaitingForRejoin,
    Dissolved,
}

#[derive(Debug)]
pub struct LocalParty<StepT: Clone> {
    pub id: PartyId,
    pub state: PartyState,
    pub secret: PartySecret,
    pub participant_ids: Vec<ParticipantId>,
    /// Transport connection currently driving this seat. `None` for a
    /// host-migration-prepared party that nobody has claimed yet.
    pub transport_id: Option<u8>,
    /// Combined steps accepted from the client, trimmed as the
    /// authoritative timeline passes them.
    pub incoming_steps: StepBuffer<StepMap<Step<StepT>>>,
    pub quality: ConnectionQuality,
    pub delayed_quality: DelayedQuality,
    pub waiting_for_rejoin_timer: usize,
    pub waiting_for_rejoin_max: usize,
    pub warning_count: u32,
    pub warning_about_zero_added_steps: u32,
    pub no_ranges_to_send_counter: u8,
}

impl<StepT: Clone> LocalParty<StepT> {
    #[must_use]
    pub fn new(
        id: PartyId,
        secret: PartySecret,
        participant_ids: Vec<ParticipantId>,
        transport_id: Option<u8>,
        current_authoritative_tick_id: TickId,
    ) -> Self {
        debug_assert!(participant_ids.len() <= MAX_LOCAL_PLAYERS);
        debug!("{id}: initialize new local party");
        Self {
            id,
            state: PartyState::Normal,
            secret,
            participant_ids,
            transport_id,
            incoming_steps: StepBuffer::new(current_authoritative_tick_id),
            quality: ConnectionQuality::new(),
            delayed_quality: DelayedQuality::default(),
            waiting_for_rejoin_timer: 0,
            waiting_for_rejoin_max: DEFAULT_WAITING_FOR_REJOIN_MAX_TICKS,
            warning_count: 0,
            warning_about_zero_added_steps: 0,
            no_ranges_to_send_counter: 0,
        }
    }

    #[must_use]
    pub fn has_participant(&self, participant_id: ParticipantId) -> bool {
        self.participant_ids.contains(&participant_id)
    }

    /// Attaches a new transport and synchronizes the buffer with the
    /// current authoritative tip. The client is expected to provide steps
    /// for the next authoritative step.
    pub fn rejoin(&mut self, transport_id: u8, current_authoritative_tick_id: TickId) {
        debug!(
            "{}: rejoined from transport connection {transport_id} at {current_authoritative_tick_id}",
            self.id
        );
        self.state = PartyState::Normal;
        self.transport_id = Some(transport_id);
        self.incoming_steps.reinit(current_authoritative_tick_id);
        self.quality.reset();
        self.delayed_quality.reset();
        self.waiting_for_rejoin_timer = 0;
        self.warning_count = 0;
        self.warning_about_zero_added_steps = 0;
        self.no_ranges_to_send_counter = 0;
    }

    pub fn set_waiting_for_rejoin(&mut self) {
        debug!("{}: setting state to waiting for rejoin", self.id);
        self.state = PartyState::WaitingForRejoin;
        self.waiting_for_rejoin_timer = 0;
    }

    fn tick_normal(&mut self) {
        let should_keep = self.delayed_quality.tick(&self.quality, self.id);
        if !should_keep {
            debug!(
                "{}: quality recommended disconnect, waiting for rejoin",
                self.id
            );
            self.set_waiting_for_rejoin();
        }
    }

    fn tick_waiting_for_rejoin(&mut self) -> bool {
        self.waiting_for_rejoin_timer += 1;
        if self.waiting_for_rejoin_timer < self.waiting_for_rejoin_max {
            return true;
        }
        debug!(
            "{}: gave up on rejoin after {} ticks",
            self.id, self.waiting_for_rejoin_timer
        );
        false
    }

    /// Advances the state machine one tick. `false` means the caller
    /// should destroy the party.
    pub fn tick(&mut self) -> bool {
        match self.state {
            PartyState::Normal => {
                self.tick_normal();
                true
            }
            PartyState::WaitingForRejoin => self.tick_waiting_for_rejoin(),
            PartyState::Dissolved => true,
        }
    }
}
