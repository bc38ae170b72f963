/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
The authoritative composer. Once enough participants have buffered steps
ahead of the authoritative tip, it combines every participant's
contribution for the next tick into one step map, forcing markers for
whoever did not deliver in time.
*/

use crate::participants::Participants;
use crate::parties::Parties;
use crate::party::PartyState;
use crate::session::GameSession;
use cadence_step::{JoinedMeta, Step};
use cadence_step_map::StepMap;
use cadence_steps::{StepBuffer, WINDOW_SIZE};
use log::{info, trace, warn};
use tick_id::TickId;

/// Composition halts when the authoritative window holds this many steps
/// that no snapshot has covered yet.
pub const MAX_AUTHORITATIVE_BUFFER_COUNT: usize = WINDOW_SIZE / 2;

/// The composer starts once somebody is this many steps ahead and nobody
/// is empty-handed.
const ADVANCE_AHEAD_THRESHOLD: usize = 3;
/// With anybody this far ahead, the composer advances no matter who is
/// lagging.
const FORCE_ADVANCE_AHEAD_THRESHOLD: usize = 5;

/// Longest contribution any used participant could make for `look_for`,
/// and the number of participants that cannot contribute at all.
fn max_contribution<StepT: Clone>(
    participants: &Participants<StepT>,
    look_for: TickId,
) -> (usize, usize) {
    let mut max_ahead = 0;
    let mut cannot_contribute = 0;

    for participant in participants.iter() {
        let steps = &participant.incoming_steps;
        if steps.is_empty() || steps.expected_write_tick_id() <= look_for {
            cannot_contribute += 1;
            continue;
        }
        let ahead = (steps.expected_write_tick_id() - look_for) as usize + 1;
        if ahead > max_ahead {
            max_ahead = ahead;
        }
    }

    (max_ahead, cannot_contribute)
}

#[must_use]
pub fn should_compose<StepT: Clone>(
    participants: &Participants<StepT>,
    look_for: TickId,
) -> bool {
    let (max_ahead, cannot_contribute) = max_contribution(participants, look_for);
    (max_ahead > ADVANCE_AHEAD_THRESHOLD && cannot_contribute == 0)
        || max_ahead > FORCE_ADVANCE_AHEAD_THRESHOLD
}

fn can_advance_due_to_distance_from_last_state<StepT: Clone>(
    authoritative_steps: &StepBuffer<StepMap<Step<StepT>>>,
) -> bool {
    let allowed = authoritative_steps.len() < MAX_AUTHORITATIVE_BUFFER_COUNT;
    if !allowed {
        warn!(
            "too many steps in the authoritative buffer ({}), waiting for a new game state",
            authoritative_steps.len()
        );
    }
    allowed
}

/// Composes the step for exactly `look_for` from every used participant.
///
/// A participant with a stored step contributes it (wrapped in the
/// one-shot `Joined` marker the first time); a participant without one is
/// carried as forced and its party's quality is charged for it.
pub fn compose_one<StepT: Clone + std::fmt::Display>(
    participants: &mut Participants<StepT>,
    parties: &mut Parties<StepT>,
    look_for: TickId,
) -> StepMap<Step<StepT>> {
    let mut combined = StepMap::new();

    let used_ids: Vec<_> = participants.iter().map(|p| p.id).collect();
    for participant_id in used_ids {
        let participant = participants
            .get_mut(participant_id)
            .expect("id was collected from used participants");
        let party_id = participant.party_id;

        let found = participant.incoming_steps.get_exact(look_for).cloned();
        let entry = match found {
            None => {
                // Drop anything stale so the window cannot clog up.
                participant.incoming_steps.discard_up_to(look_for);
                trace!(
                    "no step stored for {participant_id} in {party_id}, looking for {look_for}, marking as forced"
                );
                match parties.get_mut(party_id) {
                    Some(party) => {
                        party.quality.added_forced_steps(1);
                        if party.state == PartyState::WaitingForRejoin {
                            Step::WaitingForRejoin
                        } else {
                            Step::NotProvidedInTime
                        }
                    }
                    None => Step::NotProvidedInTime,
                }
            }
            Some(step) => {
                participant.incoming_steps.discard_up_to(look_for + 1);
                if let Some(party) = parties.get_mut(party_id) {
                    party.quality.provided_usable_step();
                }
                match step {
                    Step::Provided(payload) if !participant.has_provided_steps_before => {
                        participant.has_provided_steps_before = true;
                        info!("{participant_id} joined the authoritative timeline");
                        Step::Joined(JoinedMeta { party_id }, payload)
                    }
                    other => other,
                }
            }
        };

        combined
            .insert(participant_id, entry)
            .expect("participant ids are unique");
    }

    combined
}

/// Composes as many authoritative steps as the predicates allow. Returns
/// how many were written.
pub fn compose_all<StepT: Clone + std::fmt::Display>(session: &mut GameSession<StepT>) -> usize {
    if session.is_frozen() {
        return 0;
    }

    let mut written = 0;
    loop {
        let look_for = session.authoritative_steps.expected_write_tick_id();
        if !should_compose(&session.participants, look_for)
            || !can_advance_due_to_distance_from_last_state(&session.authoritative_steps)
        {
            break;
        }

        let combined = compose_one(&mut session.participants, &mut session.parties, look_for);
        if combined.is_empty() {
            break;
        }

        if session.authoritative_steps.push(look_for, combined).is_err() {
            warn!("could not write composed step {look_for}");
            break;
        }
        written += 1;
    }

    if written > 0 {
        trace!("composed {written} authoritative steps");
        let tip = session.authoritative_steps.expected_write_tick_id();
        for party in session.parties.iter_mut() {
            party.incoming_steps.discard_up_to(tip);
        }
    }

    written
}
