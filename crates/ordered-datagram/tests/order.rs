/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_ordered_datagram::{DatagramOrderInError, OrderedIn, OrderedOut};
use flood_rs::prelude::{InOctetStream, OutOctetStream};

fn header_for(out: &mut OrderedOut) -> Vec<u8> {
    let mut stream = OutOctetStream::new();
    out.to_stream(&mut stream).expect("should serialize");
    out.commit();
    stream.octets_ref().to_vec()
}

#[test_log::test]
fn accepts_sequence_in_order() {
    let mut out = OrderedOut::new();
    let mut ordered_in = OrderedIn::default();

    for expected_skip in [0u8, 0, 0] {
        let header = header_for(&mut out);
        let mut in_stream = InOctetStream::new(&header);
        let diff = ordered_in
            .read_and_verify(&mut in_stream)
            .expect("in-order datagram should pass");
        assert_eq!(diff.inner(), expected_skip);
    }
}

#[test_log::test]
fn rejects_duplicate_and_stale() {
    let mut out = OrderedOut::new();
    let mut ordered_in = OrderedIn::default();

    let first = header_for(&mut out);
    let second = header_for(&mut out);

    ordered_in
        .read_and_verify(&mut InOctetStream::new(&second))
        .expect("first delivery should pass");

    // The older datagram arrives late and must be discarded.
    let err = ordered_in
        .read_and_verify(&mut InOctetStream::new(&first))
        .expect_err("stale datagram must be rejected");
    assert!(matches!(err, DatagramOrderInError::WrongOrder { .. }));

    // A duplicate of the accepted one is also stale by now.
    let err = ordered_in
        .read_and_verify(&mut InOctetStream::new(&second))
        .expect_err("duplicate datagram must be rejected");
    assert!(matches!(err, DatagramOrderInError::WrongOrder { .. }));
}

#[test_log::test]
fn counts_skipped_datagrams() {
    let mut out = OrderedOut::new();
    let mut ordered_in = OrderedIn::default();

    let _lost_one = header_for(&mut out);
    let _lost_two = header_for(&mut out);
    let delivered = header_for(&mut out);

    let diff = ordered_in
        .read_and_verify(&mut InOctetStream::new(&delivered))
        .expect("successor within window should pass");
    assert_eq!(diff.inner(), 2);
}

#[test_log::test]
fn rejects_bad_marker() {
    let mut ordered_in = OrderedIn::default();
    let datagram = [0x00u8, 0x77];
    let err = ordered_in
        .read_and_verify(&mut InOctetStream::new(&datagram))
        .expect_err("marker mismatch must be rejected");
    assert!(matches!(err, DatagramOrderInError::MissingMarker(0x77)));
}
