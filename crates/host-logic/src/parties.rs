/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::err::HostLogicError;
use crate::party::{LocalParty, PartyState};
use cadence_participant::{ParticipantId, PartyId};
use cadence_protocol::PartySecret;
use log::debug;

/// Fixed pool of party slots; the slot index is the party id.
#[derive(Debug)]
pub struct Parties<StepT: Clone> {
    slots: Vec<Option<LocalParty<StepT>>>,
    count: usize,
}

impl<StepT: Clone> Parties<StepT> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, count: 0 }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn find_free_id(&self) -> Option<PartyId> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|index| PartyId(index as u8))
    }

    /// Places a freshly built party in its slot.
    pub fn insert(&mut self, party: LocalParty<StepT>) -> Result<(), HostLogicError> {
        let index = party.id.0 as usize;
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(HostLogicError::UnknownPartyId(party.id))?;
        if slot.is_some() {
            return Err(HostLogicError::UnknownPartyId(party.id));
        }
        debug!("{}: party is ready, all participants have joined", party.id);
        *slot = Some(party);
        self.count += 1;
        Ok(())
    }

    pub fn remove(&mut self, party_id: PartyId) -> Result<LocalParty<StepT>, HostLogicError> {
        let slot = self
            .slots
            .get_mut(party_id.0 as usize)
            .ok_or(HostLogicError::UnknownPartyId(party_id))?;
        let party = slot.take().ok_or(HostLogicError::UnknownPartyId(party_id))?;
        self.count -= 1;
        debug!("removed {party_id}, {} parties left", self.count);
        Ok(party)
    }

    /// Drops every party. Used when a migrated host rebuilds its seats.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.count = 0;
    }

    #[must_use]
    pub fn get(&self, party_id: PartyId) -> Option<&LocalParty<StepT>> {
        self.slots.get(party_id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, party_id: PartyId) -> Option<&mut LocalParty<StepT>> {
        self.slots
            .get_mut(party_id.0 as usize)
            .and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalParty<StepT>> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LocalParty<StepT>> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    #[must_use]
    pub fn find_by_secret(&self, secret: PartySecret) -> Option<PartyId> {
        self.iter()
            .find(|party| party.secret == secret)
            .map(|party| party.id)
    }

    /// Finds the waiting-for-rejoin party that was prepared with
    /// `participant_id` (host migration).
    #[must_use]
    pub fn find_waiting_by_participant(&self, participant_id: ParticipantId) -> Option<PartyId> {
        self.iter()
            .find(|party| {
                party.state == PartyState::WaitingForRejoin && party.has_participant(participant_id)
            })
            .map(|party| party.id)
    }

    #[must_use]
    pub fn find_by_transport(&self, transport_id: u8) -> Option<PartyId> {
        self.iter()
            .find(|party| party.transport_id == Some(transport_id))
            .map(|party| party.id)
    }
}
