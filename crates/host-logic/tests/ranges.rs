/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_host_logic::ranges::{
    pending_ranges, StepRange, CONTINUATION_STEP_COUNT, MAX_STEPS_PER_RANGE,
};
use tick_id::TickId;

#[test_log::test]
fn caught_up_client_gets_no_ranges() {
    let ranges = pending_ranges(TickId(10), TickId(0), TickId(10), 0);
    assert!(ranges.is_empty());
}

#[test_log::test]
fn client_behind_the_window_gets_no_ranges() {
    // Asking for something older than the buffer keeps forces a snapshot
    // download instead.
    let ranges = pending_ranges(TickId(3), TickId(5), TickId(40), 0);
    assert!(ranges.is_empty());
}

#[test_log::test]
fn continuation_is_capped() {
    let ranges = pending_ranges(TickId(0), TickId(0), TickId(40), u64::MAX);
    assert_eq!(
        ranges[0],
        StepRange {
            start: TickId(0),
            count: CONTINUATION_STEP_COUNT,
        }
    );
}

#[test_log::test]
fn short_continuation_covers_what_exists() {
    let ranges = pending_ranges(TickId(4), TickId(0), TickId(6), 0);
    assert_eq!(
        ranges,
        vec![StepRange {
            start: TickId(4),
            count: 2,
        }]
    );
}

#[test_log::test]
fn mask_holes_beyond_the_continuation_become_ranges() {
    // Client waits for 0, has received nothing; steps up to 40 exist. The
    // continuation covers 0..20, the mask exposes holes after it.
    let mut mask = 0u64;
    // Steps 20..=24 received (bits 19..=23), 25..=27 missing,
    // 28..=30 received (bits 27..=29), everything after missing.
    for bit in [19u32, 20, 21, 22, 23, 27, 28, 29] {
        mask |= 1 << bit;
    }
    let ranges = pending_ranges(TickId(0), TickId(0), TickId(40), mask);

    assert_eq!(ranges[0].start, TickId(0));
    assert_eq!(ranges[0].count, CONTINUATION_STEP_COUNT);

    assert_eq!(
        ranges[1],
        StepRange {
            start: TickId(25),
            count: 3,
        }
    );
    // The tail hole is clipped to the per-range maximum.
    assert_eq!(ranges[2].start, TickId(31));
    assert_eq!(ranges[2].count, MAX_STEPS_PER_RANGE);
}
