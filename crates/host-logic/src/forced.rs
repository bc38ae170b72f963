/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Forced steps fill the holes a client left behind: when its predicted step
stream skips ahead, the gap is plugged with synthetic steps so the buffers
stay gap-free and the composer never stalls on a sparse window.
*/

use crate::err::HostLogicError;
use crate::participants::Participants;
use crate::party::{LocalParty, PartyState};
use cadence_step::Step;
use cadence_step_map::StepMap;
use log::trace;

/// The marker a forced step carries for every participant in `party`.
#[must_use]
pub fn forced_step_marker<StepT: Clone>(party: &LocalParty<StepT>) -> Step<StepT> {
    if party.state == PartyState::WaitingForRejoin {
        Step::WaitingForRejoin
    } else {
        Step::NotProvidedInTime
    }
}

/// Builds the combined forced step for one tick of `party`.
#[must_use]
pub fn forced_step_map<StepT: Clone + std::fmt::Display>(party: &LocalParty<StepT>) -> StepMap<Step<StepT>> {
    let marker = forced_step_marker(party);
    let mut map = StepMap::new();
    for participant_id in &party.participant_ids {
        map.insert(*participant_id, marker.clone())
            .expect("party participant ids are unique");
    }
    map
}

/// Writes `count` forced steps at the party's write cursor, mirrored into
/// the split per-participant buffers.
pub fn insert_forced_steps<StepT: Clone + std::fmt::Display>(
    party: &mut LocalParty<StepT>,
    participants: &mut Participants<StepT>,
    count: usize,
) -> Result<(), HostLogicError> {
    trace!("{}: inserting {count} forced steps", party.id);
    let marker = forced_step_marker(party);

    for _ in 0..count {
        let tick_id = party.incoming_steps.expected_write_tick_id();
        party.incoming_steps.push(tick_id, forced_step_map(party))?;

        for participant_id in &party.participant_ids {
            let Some(participant) = participants.get_mut(*participant_id) else {
                continue;
            };
            if participant.incoming_steps.expected_write_tick_id() == tick_id {
                participant.incoming_steps.push(tick_id, marker.clone())?;
            }
        }
    }
    Ok(())
}
