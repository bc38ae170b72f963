/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_steps::{StepBuffer, StepBufferError, WINDOW_SIZE};
use tick_id::TickId;

#[test_log::test]
fn push_and_pop_in_order() {
    let mut buffer = StepBuffer::new(TickId(10));

    buffer.push(TickId(10), "first").expect("should accept");
    buffer.push(TickId(11), "second").expect("should accept");

    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.expected_write_tick_id(), TickId(12));

    let info = buffer.pop().expect("should have a step");
    assert_eq!(info.tick_id, TickId(10));
    assert_eq!(info.step, "first");
    assert_eq!(buffer.expected_read_tick_id(), TickId(11));
}

#[test_log::test]
fn push_rejects_wrong_tick() {
    let mut buffer = StepBuffer::new(TickId(0));
    buffer.push(TickId(0), 1u8).expect("should accept");

    let err = buffer.push(TickId(5), 2u8).expect_err("gap must be rejected");
    assert_eq!(
        err,
        StepBufferError::UnexpectedTickId {
            expected: TickId(1),
            encountered: TickId(5),
        }
    );
    // A stale tick is rejected the same way.
    assert!(buffer.push(TickId(0), 3u8).is_err());
}

#[test_log::test]
fn window_is_bounded() {
    let mut buffer = StepBuffer::new(TickId(0));
    for i in 0..WINDOW_SIZE as u32 {
        buffer.push(TickId(i), i).expect("should fit in window");
    }

    let err = buffer
        .push(TickId(WINDOW_SIZE as u32), 999)
        .expect_err("window must be full");
    assert_eq!(
        err,
        StepBufferError::WindowIsFull {
            window_size: WINDOW_SIZE
        }
    );

    buffer.pop().expect("pop should work");
    buffer
        .push(TickId(WINDOW_SIZE as u32), 999)
        .expect("should fit again after a pop");
}

#[test_log::test]
fn get_exact_does_not_advance() {
    let mut buffer = StepBuffer::new(TickId(100));
    buffer.push(TickId(100), "a").expect("should accept");
    buffer.push(TickId(101), "b").expect("should accept");

    assert_eq!(buffer.get_exact(TickId(101)), Some(&"b"));
    assert_eq!(buffer.get_exact(TickId(101)), Some(&"b"));
    assert_eq!(buffer.get_exact(TickId(99)), None);
    assert_eq!(buffer.get_exact(TickId(102)), None);
    assert_eq!(buffer.expected_read_tick_id(), TickId(100));
}

#[test_log::test]
fn dropped_count_measures_the_gap() {
    let mut buffer = StepBuffer::new(TickId(4));
    buffer.push(TickId(4), ()).expect("should accept");

    assert_eq!(buffer.dropped_count(TickId(5)), 0);
    assert_eq!(buffer.dropped_count(TickId(2)), 0);
    assert_eq!(buffer.dropped_count(TickId(9)), 4);
}

#[test_log::test]
fn discard_up_to_advances_read_cursor() {
    let mut buffer = StepBuffer::new(TickId(0));
    for i in 0..6u32 {
        buffer.push(TickId(i), i).expect("should accept");
    }

    let discarded = buffer.discard_up_to(TickId(4));
    assert_eq!(discarded, 4);
    assert_eq!(buffer.expected_read_tick_id(), TickId(4));
    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.get_exact(TickId(4)), Some(&4));
    assert_eq!(buffer.get_exact(TickId(3)), None);
}

#[test_log::test]
fn reinit_moves_both_cursors() {
    let mut buffer = StepBuffer::new(TickId(0));
    buffer.push(TickId(0), 7u8).expect("should accept");

    buffer.reinit(TickId(90));
    assert!(buffer.is_empty());
    assert_eq!(buffer.expected_read_tick_id(), TickId(90));
    assert_eq!(buffer.expected_write_tick_id(), TickId(90));
    buffer.push(TickId(90), 8u8).expect("should accept at new tick");
}

#[test_log::test]
fn range_vec_requires_full_run() {
    let mut buffer = StepBuffer::new(TickId(10));
    for i in 10..15u32 {
        buffer.push(TickId(i), i).expect("should accept");
    }

    assert_eq!(buffer.range_vec(TickId(11), 3), Some(vec![11, 12, 13]));
    assert_eq!(buffer.range_vec(TickId(13), 5), None);
    assert_eq!(buffer.range_vec(TickId(9), 1), None);
}
