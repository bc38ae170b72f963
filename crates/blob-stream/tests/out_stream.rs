/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_blob_stream::out_stream::BlobStreamOut;
use monotonic_time_rs::Millis;
use std::time::Duration;

const RESEND: Duration = Duration::from_millis(100);

#[test_log::test]
fn sends_all_chunks_once() {
    let mut stream = BlobStreamOut::new(5, RESEND);
    let now = Millis::new(0);

    let first_batch = stream.send(now, 3);
    assert_eq!(first_batch, vec![0, 1, 2]);

    let second_batch = stream.send(now, 3);
    assert_eq!(second_batch, vec![3, 4]);

    // Everything was just sent, nothing is due yet.
    assert!(stream.send(now, 3).is_empty());
}

#[test_log::test]
fn resends_after_duration() {
    let mut stream = BlobStreamOut::new(2, RESEND);
    let now = Millis::new(0);

    assert_eq!(stream.send(now, 2).len(), 2);
    assert!(stream.send(Millis::new(50), 2).is_empty());

    let resent = stream.send(Millis::new(200), 2);
    assert_eq!(resent.len(), 2);
}

#[test_log::test]
fn ack_confirms_prefix_and_mask() {
    let mut stream = BlobStreamOut::new(6, RESEND);
    let now = Millis::new(0);
    stream.send(now, 6);

    // Receiver has 0..=1 and, via the mask, chunk 3 (bit 0 covers index 3).
    stream
        .set_waiting_for_chunk_index(2, 0b01)
        .expect("ack should be in bounds");
    assert!(!stream.is_received_by_remote());

    let due = stream.send(Millis::new(500), 6);
    assert_eq!(due, vec![2, 4, 5]);

    stream
        .set_waiting_for_chunk_index(6, 0)
        .expect("ack should be in bounds");
    assert!(stream.is_received_by_remote());
    assert!(stream.send(Millis::new(900), 6).is_empty());
}

#[test_log::test]
fn rejects_out_of_bounds_ack() {
    let mut stream = BlobStreamOut::new(3, RESEND);
    assert!(stream.set_waiting_for_chunk_index(4, 0).is_err());
}
