/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Fixed-capacity pool of participants with a FIFO free-list for their ids.
*/

use crate::err::HostLogicError;
use crate::id_ring::{IdRing, ID_RING_CAPACITY};
use cadence_participant::{ParticipantId, PartyId};
use cadence_step::Step;
use cadence_steps::StepBuffer;
use log::debug;
use tick_id::TickId;

/// One player slot and the split predicted steps it has pending.
#[derive(Debug)]
pub struct Participant<StepT: Clone> {
    pub id: ParticipantId,
    pub local_index: u8,
    pub party_id: PartyId,
    /// Latched on the first contributed step; drives the one-shot `Joined`
    /// marker in composed steps. Survives rejoin.
    pub has_provided_steps_before: bool,
    pub incoming_steps: StepBuffer<Step<StepT>>,
}

/// All participants in the game, addressed by their stable id.
#[derive(Debug)]
pub struct Participants<StepT: Clone> {
    slots: Vec<Option<Participant<StepT>>>,
    free_ids: IdRing,
    count: usize,
}

impl<StepT: Clone> Participants<StepT> {
    /// # Panics
    /// Panics when `capacity` does not fit the id ring.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity <= ID_RING_CAPACITY,
            "participant capacity must be 1..={ID_RING_CAPACITY}"
        );
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            free_ids: IdRing::with_range(0, capacity),
            count: 0,
        }
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
    pub fn free_id_count(&self) -> usize {
        self.free_ids.count()
    }

    #[must_use]
    pub fn get(&self, id: ParticipantId) -> Option<&Participant<StepT>> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant<StepT>> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant<StepT>> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant<StepT>> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Allocates one participant per local player index, all belonging to
    /// `party_id`. Buffers start at `initial_tick_id`.
    pub fn join(
        &mut self,
        local_indices: &[u8],
        party_id: PartyId,
        initial_tick_id: TickId,
    ) -> Result<Vec<ParticipantId>, HostLogicError> {
        if self.count + local_indices.len() > self.capacity() {
            return Err(HostLogicError::SessionFull);
        }

        let mut created = Vec::with_capacity(local_indices.len());
        for local_index in local_indices {
            let id_value = self
                .free_ids
                .pop()
                .map_err(|_| HostLogicError::SessionFull)?;
            let id = ParticipantId(id_value);
            debug!("allocating participant {id} for local index {local_index}");

            let slot = self
                .slots
                .get_mut(id_value as usize)
                .expect("free list ids are within capacity");
            debug_assert!(slot.is_none(), "free list handed out a used id");
            *slot = Some(Participant {
                id,
                local_index: *local_index,
                party_id,
                has_provided_steps_before: false,
                incoming_steps: StepBuffer::new(initial_tick_id),
            });
            self.count += 1;
            created.push(id);
        }

        Ok(created)
    }

    /// Claims a specific id for a host-migration-prepared seat. The
    /// participant is latched as having provided steps before, so the
    /// migrated session never re-announces it.
    pub fn prepare(
        &mut self,
        id: ParticipantId,
        party_id: PartyId,
        initial_tick_id: TickId,
    ) -> Result<(), HostLogicError> {
        if id.0 as usize >= self.capacity() {
            return Err(HostLogicError::IllegalParticipantId(id));
        }
        if self.count + 1 > self.capacity() {
            return Err(HostLogicError::SessionFull);
        }

        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .expect("capacity checked above");
        if slot.is_some() {
            return Err(HostLogicError::ParticipantAlreadyInUse(id));
        }

        debug!("preparing participant {id} for host migration");
        *slot = Some(Participant {
            id,
            local_index: 0,
            party_id,
            has_provided_steps_before: true,
            incoming_steps: StepBuffer::new(initial_tick_id),
        });
        self.count += 1;
        Ok(())
    }

    /// Returns the id to the back of the free list.
    pub fn destroy(&mut self, id: ParticipantId) -> Result<(), HostLogicError> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .ok_or(HostLogicError::IllegalParticipantId(id))?;
        if slot.take().is_none() {
            return Err(HostLogicError::IllegalParticipantId(id));
        }

        debug!("destroying participant {id}");
        self.count -= 1;
        self.free_ids
            .push(id.0)
            .map_err(|_| HostLogicError::FreeListError(id))?;
        Ok(())
    }

    /// Rebuilds the free list from scratch, keeping every id in
    /// `taken_ids` out of it. Used after host migration has claimed
    /// specific seats.
    pub fn rebuild_free_ids(&mut self, taken_ids: &[ParticipantId]) {
        self.free_ids.clear();
        for id_value in 0..self.capacity() as u8 {
            if taken_ids.iter().any(|taken| taken.0 == id_value) {
                continue;
            }
            self.free_ids
                .push(id_value)
                .expect("capacity fits the ring");
        }
    }
}
