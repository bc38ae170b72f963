/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_connection_layer::{
    verify_hash, write_to_stream, ConnectionId, ConnectionLayerMode, ConnectionSecretSeed,
};
use flood_rs::prelude::{InOctetStream, OutOctetStream};

#[test_log::test]
fn header_round_trip_verifies() {
    let seed = ConnectionSecretSeed(0x5EED_CAFE);
    let payload = b"lockstep payload";

    let mut out = OutOctetStream::new();
    write_to_stream(&mut out, ConnectionId { value: 3 }, seed, payload)
        .expect("header should serialize");

    let datagram = out.octets_ref().to_vec();
    let mut in_stream = InOctetStream::new(&datagram);
    let mode = ConnectionLayerMode::from_stream(&mut in_stream).expect("should parse");

    match mode {
        ConnectionLayerMode::Connection(layer) => {
            assert_eq!(layer.connection_id.value, 3);
            verify_hash(layer.murmur3_hash, seed, payload).expect("hash should verify");
        }
        ConnectionLayerMode::OutOfBand => panic!("expected a connection header"),
    }
}

#[test_log::test]
fn wrong_seed_is_rejected() {
    let seed = ConnectionSecretSeed(1);
    let payload = b"payload";

    let mut out = OutOctetStream::new();
    write_to_stream(&mut out, ConnectionId { value: 9 }, seed, payload)
        .expect("header should serialize");

    let datagram = out.octets_ref().to_vec();
    let mut in_stream = InOctetStream::new(&datagram);
    let ConnectionLayerMode::Connection(layer) =
        ConnectionLayerMode::from_stream(&mut in_stream).expect("should parse")
    else {
        panic!("expected a connection header");
    };

    assert!(verify_hash(layer.murmur3_hash, ConnectionSecretSeed(2), payload).is_err());
    assert!(verify_hash(layer.murmur3_hash, seed, b"other payload").is_err());
}

#[test_log::test]
fn zero_connection_id_is_out_of_band() {
    let datagram = [0u8, 0x42];
    let mut in_stream = InOctetStream::new(&datagram);
    let mode = ConnectionLayerMode::from_stream(&mut in_stream).expect("should parse");
    assert!(matches!(mode, ConnectionLayerMode::OutOfBand));
}
