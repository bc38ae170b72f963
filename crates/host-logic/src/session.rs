/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
The game session owns the authoritative timeline and everyone feeding it:
the participants registry and the local parties.
*/

use crate::participants::Participants;
use crate::parties::Parties;
use cadence_step::Step;
use cadence_step_map::StepMap;
use cadence_steps::StepBuffer;
use tick_id::TickId;

#[derive(Debug)]
pub struct GameSession<StepT: Clone> {
    pub authoritative_steps: StepBuffer<StepMap<Step<StepT>>>,
    pub participants: Participants<StepT>,
    pub parties: Parties<StepT>,
    is_frozen: bool,
}

impl<StepT: Clone> GameSession<StepT> {
    #[must_use]
    pub fn new(tick_id: TickId, max_participant_count: usize, max_party_count: usize) -> Self {
        Self {
            authoritative_steps: StepBuffer::new(tick_id),
            participants: Participants::new(max_participant_count),
            parties: Parties::new(max_party_count),
            is_frozen: false,
        }
    }

    /// The tick the composer will produce next.
    #[must_use]
    pub fn tick_id_to_produce(&self) -> TickId {
        self.authoritative_steps.expected_write_tick_id()
    }

    /// Stops composition without tearing anything down. Debug facility.
    pub fn freeze(&mut self) {
        self.is_frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.is_frozen = false;
    }

    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.is_frozen
    }
}
