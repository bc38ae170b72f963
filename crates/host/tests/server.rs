/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_connection_layer::{verify_hash, write_to_stream, ConnectionId, ConnectionSecretSeed};
use cadence_host::prelude::*;
use cadence_ordered_datagram::OrderedOut;
use cadence_participant::ParticipantId;
use cadence_protocol::prelude::*;
use cadence_sample_step::SampleStep;
use cadence_secure_random::SequenceRandom;
use cadence_step::Step;
use cadence_step_map::StepMap;
use flood_rs::prelude::{InOctetStream, OutOctetStream};
use flood_rs::{Deserialize, ReadOctetStream, Serialize, WriteOctetStream};
use monotonic_time_rs::Millis;
use std::cell::RefCell;
use std::rc::Rc;
use tick_id::TickId;

const CLIENT_TIME: u16 = 0xF00D;

struct TestStateProvider {
    tick_id: TickId,
    payload: Vec<u8>,
}

impl GameStateProvider for TestStateProvider {
    fn state(&self, _: TickId) -> (TickId, Vec<u8>) {
        (self.tick_id, self.payload.clone())
    }
}

fn test_setup(max_connection_count: usize) -> HostSetup {
    HostSetup {
        application_version: app_version::Version::new(0, 1, 2),
        max_connection_count,
        max_participant_count: 8,
        max_participants_per_connection: 8,
        max_single_participant_step_octet_count: 8,
        max_game_state_octet_count: 64 * 1024,
        max_waiting_for_rejoin_ticks: 32,
        target_tick_time_ms: 16,
    }
}

fn new_server(max_connection_count: usize) -> Server<SampleStep> {
    Server::new(
        test_setup(max_connection_count),
        TickId(0),
        Rc::new(RefCell::new(SequenceRandom { next: 0xBEEF })),
    )
    .expect("setup should be valid")
}

fn oob_connect_datagram(nonce: u64) -> Vec<u8> {
    let mut out = OutOctetStream::new();
    out.write_u8(0).expect("should write oob id");
    ClientToHostCommands::<SampleStep>::ConnectType(ConnectRequest {
        protocol_version: PROTOCOL_VERSION,
        use_debug_stream: false,
        application_version: Version::new(0, 1, 2),
        nonce: Nonce(nonce),
    })
    .serialize(&mut out)
    .expect("should serialize");
    out.octets_ref().to_vec()
}

/// Client-side framing: builds the hashed, ordered datagrams the host
/// expects on an established connection.
struct ClientFraming {
    connection_id: u8,
    secret: ConnectionSecret,
    ordered_out: OrderedOut,
}

impl ClientFraming {
    fn frame(&mut self, commands: &[ClientToHostCommands<SampleStep>]) -> Vec<u8> {
        let mut inner = OutOctetStream::new();
        self.ordered_out
            .to_stream(&mut inner)
            .expect("should serialize");
        self.ordered_out.commit();
        inner.write_u16(CLIENT_TIME).expect("should serialize");
        for command in commands {
            command.serialize(&mut inner).expect("should serialize");
        }

        let mut datagram = OutOctetStream::new();
        write_to_stream(
            &mut datagram,
            ConnectionId {
                value: self.connection_id,
            },
            ConnectionSecretSeed(self.secret.value as u32),
            inner.octets_ref(),
        )
        .expect("should serialize");
        datagram
            .write(inner.octets_ref())
            .expect("should serialize");
        datagram.octets_ref().to_vec()
    }
}

fn feed(
    server: &mut Server<SampleStep>,
    transport_index: u8,
    datagram: &[u8],
    state: &TestStateProvider,
) -> Result<Vec<Vec<u8>>, HostError> {
    let mut replies = Vec::new();
    server.feed(
        Millis::new(0),
        transport_index,
        datagram,
        &mut |octets| replies.push(octets.to_vec()),
        state,
    )?;
    Ok(replies)
}

fn parse_connect_reply(datagram: &[u8]) -> ConnectionAccepted {
    assert_eq!(datagram[0], 0, "connect replies are out-of-band");
    let mut stream = InOctetStream::new(&datagram[1..]);
    let command =
        HostToClientCommands::<Step<SampleStep>>::deserialize(&mut stream).expect("should parse");
    match command {
        HostToClientCommands::ConnectType(accepted) => accepted,
        other => panic!("expected a connect response, got {other}"),
    }
}

/// Parses the first command of a framed host reply, verifying the hash
/// with the connection secret on the way.
fn parse_framed_reply(datagram: &[u8], secret: ConnectionSecret) -> HostToClientCommands<Step<SampleStep>> {
    let payload = &datagram[5..];
    let mut header = InOctetStream::new(datagram);
    let _connection_id = header.read_u8().expect("should read id");
    let hash = header.read_u32().expect("should read hash");
    verify_hash(hash, ConnectionSecretSeed(secret.value as u32), payload)
        .expect("hash should verify");

    assert_eq!(payload[1], 0xDD, "ordered marker expected");
    let mut stream = InOctetStream::new(&payload[4..]);
    HostToClientCommands::<Step<SampleStep>>::deserialize(&mut stream).expect("should parse")
}

fn connect(server: &mut Server<SampleStep>, transport_index: u8, state: &TestStateProvider) -> ClientFraming {
    let replies = feed(server, transport_index, &oob_connect_datagram(0xAABB), state)
        .expect("connect should pass");
    let accepted = parse_connect_reply(&replies[0]);
    ClientFraming {
        connection_id: accepted.connection_id,
        secret: accepted.connection_secret,
        ordered_out: OrderedOut::new(),
    }
}

#[test_log::test]
fn clean_boot_connect_is_idempotent() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };

    let datagram = oob_connect_datagram(0xAABB);
    let replies = feed(&mut server, 3, &datagram, &state).expect("connect should pass");
    assert_eq!(replies.len(), 1);

    let accepted = parse_connect_reply(&replies[0]);
    assert!(accepted.connection_id >= 1 && accepted.connection_id < 8);
    assert_ne!(accepted.connection_secret.value, 0);

    // The same datagram again: identical response, no new allocation.
    let replies = feed(&mut server, 3, &datagram, &state).expect("repeat should pass");
    let repeated = parse_connect_reply(&replies[0]);
    assert_eq!(repeated.connection_id, accepted.connection_id);
    assert_eq!(
        repeated.connection_secret.value,
        accepted.connection_secret.value
    );

    // A different transport index with the same nonce is a new peer.
    let replies = feed(&mut server, 4, &datagram, &state).expect("connect should pass");
    let other = parse_connect_reply(&replies[0]);
    assert_ne!(other.connection_id, accepted.connection_id);
}

#[test_log::test]
fn join_and_steps_over_framed_datagrams() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };

    let mut client = connect(&mut server, 3, &state);

    let join = client.frame(&[ClientToHostCommands::JoinGameType(JoinGameRequest {
        client_request_id: ClientRequestId(0),
        join_kind: JoinGameKind::NoSecret,
        player_requests: JoinPlayerRequests {
            players: vec![JoinPlayerRequest { local_index: 0 }],
        },
    })]);
    let replies = feed(&mut server, 3, &join, &state).expect("join should pass");
    assert_eq!(replies.len(), 1);

    let HostToClientCommands::JoinGame(accepted) = parse_framed_reply(&replies[0], client.secret)
    else {
        panic!("expected a join accept");
    };
    let participant_id = accepted.participants.0[0].participant_id;
    assert_eq!(participant_id, ParticipantId(0));

    let steps: Vec<StepMap<SampleStep>> = (0..6)
        .map(|_| {
            let mut map = StepMap::new();
            map.insert(participant_id, SampleStep::Jump)
                .expect("one participant per map");
            map
        })
        .collect();
    let steps_datagram = client.frame(&[ClientToHostCommands::Steps(StepsRequest {
        ack: StepsAck {
            waiting_for_tick_id: TickId(0),
            receive_mask: 0,
        },
        combined_predicted_steps: CombinedSteps {
            tick_id: TickId(0),
            steps,
        },
    })]);
    let replies = feed(&mut server, 3, &steps_datagram, &state).expect("steps should pass");

    let HostToClientCommands::GameStep(response) = parse_framed_reply(&replies[0], client.secret)
    else {
        panic!("expected a game step response");
    };
    assert!(!response.authoritative_steps.ranges.is_empty());
    assert_eq!(response.authoritative_steps.ranges[0].tick_id, TickId(0));

    assert_eq!(
        server.logic().session().tick_id_to_produce(),
        TickId(4),
        "six buffered steps advance the timeline to tick 4"
    );
}

#[test_log::test]
fn datagram_from_wrong_transport_index_is_dropped() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };

    let mut client = connect(&mut server, 3, &state);
    let join = client.frame(&[ClientToHostCommands::JoinGameType(JoinGameRequest {
        client_request_id: ClientRequestId(0),
        join_kind: JoinGameKind::NoSecret,
        player_requests: JoinPlayerRequests {
            players: vec![JoinPlayerRequest { local_index: 0 }],
        },
    })]);

    // Same octets, delivered from a different transport index.
    let result = feed(&mut server, 9, &join, &state);
    assert!(matches!(
        result,
        Err(HostError::WrongTransportIndex { .. })
    ));
    assert_eq!(server.logic().session().participants.count(), 0);
}

#[test_log::test]
fn tampered_datagram_fails_the_hash_check() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };

    let mut client = connect(&mut server, 3, &state);
    let mut join = client.frame(&[ClientToHostCommands::JoinGameType(JoinGameRequest {
        client_request_id: ClientRequestId(0),
        join_kind: JoinGameKind::NoSecret,
        player_requests: JoinPlayerRequests {
            players: vec![JoinPlayerRequest { local_index: 0 }],
        },
    })]);
    let last = join.len() - 1;
    join[last] ^= 0xFF;

    let result = feed(&mut server, 3, &join, &state);
    assert!(matches!(result, Err(HostError::HashMismatch)));
}

#[test_log::test]
fn duplicate_datagram_is_dropped_by_ordering() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };

    let mut client = connect(&mut server, 3, &state);
    let join = client.frame(&[ClientToHostCommands::JoinGameType(JoinGameRequest {
        client_request_id: ClientRequestId(0),
        join_kind: JoinGameKind::NoSecret,
        player_requests: JoinPlayerRequests {
            players: vec![JoinPlayerRequest { local_index: 0 }],
        },
    })]);

    feed(&mut server, 3, &join, &state).expect("first delivery should pass");
    let result = feed(&mut server, 3, &join, &state);
    assert!(matches!(result, Err(HostError::OutOfOrderDatagram(_))));
    assert_eq!(server.logic().session().participants.count(), 1);
}

struct LoopbackTransport {
    incoming: Vec<(u8, Vec<u8>)>,
    sent: Vec<(u8, Vec<u8>)>,
}

impl MultiTransport for LoopbackTransport {
    fn send_to(&mut self, transport_index: u8, octets: &[u8]) {
        self.sent.push((transport_index, octets.to_vec()));
    }

    fn receive(&mut self) -> Option<(u8, Vec<u8>)> {
        if self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }
}

#[test_log::test]
fn update_drains_transport_and_replies() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };

    let mut transport = LoopbackTransport {
        incoming: vec![(5, oob_connect_datagram(0x42))],
        sent: vec![],
    };

    server
        .update(Millis::new(16), &mut transport, &state)
        .expect("update should pass");

    assert_eq!(transport.sent.len(), 1);
    let (reply_index, reply) = &transport.sent[0];
    assert_eq!(*reply_index, 5);
    let accepted = parse_connect_reply(reply);
    assert!(accepted.connection_id >= 1);
}

#[test_log::test]
fn host_that_cannot_keep_its_tick_rate_stops() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };
    let mut transport = LoopbackTransport {
        incoming: vec![],
        sent: vec![],
    };

    // Every tick takes 1000 ms against a 16 ms target.
    let mut now_ms: u64 = 0;
    let mut failed = false;
    for _ in 0..70 {
        now_ms += 1000;
        if server
            .update(Millis::new(now_ms), &mut transport, &state)
            .is_err()
        {
            failed = true;
            break;
        }
    }
    assert!(failed, "the tick watchdog should have fired");
}

#[test_log::test]
fn host_migration_attaches_returning_client() {
    let mut server = new_server(8);
    let state = TestStateProvider {
        tick_id: TickId(0),
        payload: vec![0xff],
    };

    server
        .host_migration(&[ParticipantId(2), ParticipantId(5)])
        .expect("migration should pass");

    let mut client = connect(&mut server, 1, &state);
    let join = client.frame(&[ClientToHostCommands::JoinGameType(JoinGameRequest {
        client_request_id: ClientRequestId(0),
        join_kind: JoinGameKind::HostMigrationParticipantId(ParticipantId(5)),
        player_requests: JoinPlayerRequests {
            players: vec![JoinPlayerRequest { local_index: 0 }],
        },
    })]);
    let replies = feed(&mut server, 1, &join, &state).expect("join should pass");

    let HostToClientCommands::JoinGame(accepted) = parse_framed_reply(&replies[0], client.secret)
    else {
        panic!("expected a join accept");
    };
    assert_eq!(accepted.participants.0[0].participant_id, ParticipantId(5));
}
