/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Selection of authoritative step ranges for a game-step reply.

The client reports the step it is waiting for plus a receive mask for the
64 steps after it. The host answers with the holes the mask exposes and a
redundant continuation run from the waiting-for step, so a lost reply
costs one round trip instead of a stall.
*/

use cadence_protocol::serialize::CombinedSteps;
use cadence_step::Step;
use cadence_step_map::StepMap;
use cadence_steps::StepBuffer;
use flood_rs::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use tick_id::TickId;

/// Most mask-derived ranges per reply.
pub const MAX_PENDING_RANGES: usize = 3;
/// Longest mask-derived range.
pub const MAX_STEPS_PER_RANGE: usize = 8;
/// Length of the redundant continuation range. Tuned so a full reply stays
/// well under the 1200-octet datagram budget.
pub const CONTINUATION_STEP_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StepRange {
    pub start: TickId,
    pub count: usize,
}

/// Derives the ranges to send for a client waiting for `waiting_for`: the
/// redundant continuation run first, then the holes the receive mask
/// exposes beyond it. Ranges are ascending and disjoint, which the range
/// serialization requires.
///
/// Returns an empty list when the client asks for something older than the
/// buffer provides; the client has to resync via snapshot download then.
#[must_use]
pub fn pending_ranges(
    waiting_for: TickId,
    expected_read: TickId,
    expected_write: TickId,
    receive_mask: u64,
) -> Vec<StepRange> {
    if waiting_for < expected_read || expected_write <= waiting_for {
        return Vec::new();
    }

    let mut ranges = Vec::new();

    // The client is stuck on `waiting_for`; always resend from there.
    let available = (expected_write - waiting_for) as usize;
    let continuation_count = available.min(CONTINUATION_STEP_COUNT);
    ranges.push(StepRange {
        start: waiting_for,
        count: continuation_count,
    });
    let continuation_end = waiting_for + continuation_count as u32;

    let mut open_range: Option<StepRange> = None;
    for bit in 0..64u32 {
        if ranges.len() > MAX_PENDING_RANGES {
            break;
        }
        let step = waiting_for + 1 + bit;
        if step >= expected_write {
            break;
        }
        let is_covered = step < continuation_end || receive_mask & (1u64 << bit) != 0;
        if is_covered {
            if let Some(range) = open_range.take() {
                ranges.push(range);
            }
            continue;
        }

        match open_range.as_mut() {
            Some(range) if range.count < MAX_STEPS_PER_RANGE => range.count += 1,
            Some(_) => {
                ranges.push(open_range.take().expect("range is open"));
                open_range = Some(StepRange {
                    start: step,
                    count: 1,
                });
            }
            None => {
                open_range = Some(StepRange {
                    start: step,
                    count: 1,
                });
            }
        }
    }
    if let Some(range) = open_range {
        if ranges.len() <= MAX_PENDING_RANGES {
            ranges.push(range);
        }
    }

    ranges
}

/// Clones the selected ranges out of the authoritative buffer. Ranges that
/// fell out of the window are skipped.
#[must_use]
pub fn collect_ranges<StepT>(
    authoritative_steps: &StepBuffer<StepMap<Step<StepT>>>,
    ranges: &[StepRange],
) -> Vec<CombinedSteps<Step<StepT>>>
where
    StepT: Clone + Debug + Serialize + Deserialize + Display,
{
    ranges
        .iter()
        .filter_map(|range| {
            authoritative_steps
                .range_vec(range.start, range.count)
                .map(|steps| CombinedSteps {
                    tick_id: range.start,
                    steps,
                })
        })
        .collect()
}
