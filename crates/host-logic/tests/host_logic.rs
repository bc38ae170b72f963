/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_host_logic::party::PartyState;
use cadence_host_logic::{GameStateProvider, HostLogic, HostLogicConfig};
use cadence_participant::{ParticipantId, PartyId};
use cadence_protocol::prelude::*;
use cadence_sample_step::SampleStep;
use cadence_secure_random::SequenceRandom;
use cadence_step::Step;
use cadence_step_map::StepMap;
use monotonic_time_rs::Millis;
use std::cell::RefCell;
use std::rc::Rc;
use tick_id::TickId;

pub struct TestStateProvider {
    pub tick_id: TickId,
    pub payload: Vec<u8>,
    pub serialize_count: RefCell<usize>,
}

impl TestStateProvider {
    fn new(tick_id: TickId, payload: Vec<u8>) -> Self {
        Self {
            tick_id,
            payload,
            serialize_count: RefCell::new(0),
        }
    }
}

impl GameStateProvider for TestStateProvider {
    fn state(&self, _: TickId) -> (TickId, Vec<u8>) {
        *self.serialize_count.borrow_mut() += 1;
        (self.tick_id, self.payload.clone())
    }
}

const APP_VERSION: app_version::Version = app_version::Version::new(0, 1, 2);

fn new_logic() -> HostLogic<SampleStep> {
    HostLogic::new(
        TickId(0),
        APP_VERSION,
        HostLogicConfig {
            max_participant_count: 8,
            max_party_count: 8,
            max_participants_per_connection: 8,
            waiting_for_rejoin_max_ticks: 32,
            max_game_state_octet_count: 64 * 1024,
        },
        Rc::new(RefCell::new(SequenceRandom { next: 0x1000 })),
    )
}

fn connect_request() -> ClientToHostCommands<SampleStep> {
    ClientToHostCommands::ConnectType(ConnectRequest {
        protocol_version: PROTOCOL_VERSION,
        use_debug_stream: false,
        application_version: Version::new(0, 1, 2),
        nonce: Nonce(0xAABB),
    })
}

fn join_request(kind: JoinGameKind, player_count: u8) -> ClientToHostCommands<SampleStep> {
    ClientToHostCommands::JoinGameType(JoinGameRequest {
        client_request_id: ClientRequestId(0),
        join_kind: kind,
        player_requests: JoinPlayerRequests {
            players: (0..player_count)
                .map(|local_index| JoinPlayerRequest { local_index })
                .collect(),
        },
    })
}

fn steps_request(
    participant_id: ParticipantId,
    waiting_for: TickId,
    first: TickId,
    payloads: &[SampleStep],
) -> ClientToHostCommands<SampleStep> {
    let steps = payloads
        .iter()
        .map(|payload| {
            let mut map = StepMap::new();
            map.insert(participant_id, payload.clone())
                .expect("one participant per map");
            map
        })
        .collect();

    ClientToHostCommands::Steps(StepsRequest {
        ack: StepsAck {
            waiting_for_tick_id: waiting_for,
            receive_mask: 0,
        },
        combined_predicted_steps: CombinedSteps {
            tick_id: first,
            steps,
        },
    })
}

fn connect_and_join(
    logic: &mut HostLogic<SampleStep>,
    connection_id: u8,
    state: &TestStateProvider,
) -> (ParticipantId, PartyId, PartySecret) {
    let now = Millis::new(0);
    logic
        .register_connection(connection_id)
        .expect("connection id should be free");
    logic
        .update(connection_id, now, &connect_request(), state)
        .expect("connect should pass");

    let responses = logic
        .update(connection_id, now, &join_request(JoinGameKind::NoSecret, 1), state)
        .expect("join should pass");
    assert_eq!(responses.len(), 1);

    let HostToClientCommands::JoinGame(accepted) = &responses[0] else {
        panic!("expected a join accept, got {:?}", responses[0]);
    };
    assert_eq!(accepted.participants.0.len(), 1);

    (
        accepted.participants.0[0].participant_id,
        accepted.party_and_secret.party_id,
        accepted.party_and_secret.secret,
    )
}

#[test_log::test]
fn join_assigns_first_free_participant_id() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);

    let (participant_id, party_id, secret) = connect_and_join(&mut logic, 1, &state);
    assert_eq!(participant_id, ParticipantId(0));
    assert_eq!(party_id, PartyId(0));
    assert_ne!(secret.value, 0);
    assert_eq!(logic.session().participants.count(), 1);
}

#[test_log::test]
fn commands_before_connect_are_rejected() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);

    logic.register_connection(1).expect("id should be free");
    let result = logic.update(
        1,
        Millis::new(0),
        &join_request(JoinGameKind::NoSecret, 1),
        &state,
    );
    assert!(result.is_err());
}

#[test_log::test]
fn predicted_steps_advance_the_authoritative_timeline() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);
    let (participant_id, party_id, _) = connect_and_join(&mut logic, 1, &state);

    let payloads = [
        SampleStep::MoveLeft(1),
        SampleStep::MoveRight(2),
        SampleStep::Jump,
        SampleStep::Nothing,
        SampleStep::Jump,
        SampleStep::Nothing,
    ];
    let responses = logic
        .update(
            1,
            Millis::new(0),
            &steps_request(participant_id, TickId(0), TickId(0), &payloads),
            &state,
        )
        .expect("steps should be accepted");

    // Six buffered steps let the composer advance to tick 4.
    assert_eq!(logic.session().tick_id_to_produce(), TickId(4));

    let HostToClientCommands::GameStep(response) = &responses[0] else {
        panic!("expected a game step response");
    };
    assert_eq!(response.response_header.last_received_step_id, TickId(5));
    assert_eq!(response.authoritative_steps.ranges.len(), 1);

    let range = &response.authoritative_steps.ranges[0];
    assert_eq!(range.tick_id, TickId(0));
    assert_eq!(range.steps.len(), 4);
    match range.steps[0]
        .get(&participant_id)
        .expect("participant is in the composed step")
    {
        Step::Joined(meta, payload) => {
            assert_eq!(meta.party_id, party_id);
            assert_eq!(*payload, SampleStep::MoveLeft(1));
        }
        other => panic!("expected join marker, got {other:?}"),
    }
}

#[test_log::test]
fn stale_steps_are_ignored() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);
    let (participant_id, party_id, _) = connect_and_join(&mut logic, 1, &state);

    let payloads = [SampleStep::Jump, SampleStep::Jump, SampleStep::Jump];
    logic
        .update(
            1,
            Millis::new(0),
            &steps_request(participant_id, TickId(0), TickId(0), &payloads),
            &state,
        )
        .expect("steps should be accepted");

    // The same steps again: a redundant resend, accepted but adding zero.
    logic
        .update(
            1,
            Millis::new(0),
            &steps_request(participant_id, TickId(0), TickId(0), &payloads),
            &state,
        )
        .expect("redundant steps should not error");

    let party = logic
        .session()
        .parties
        .get(party_id)
        .expect("party exists");
    assert_eq!(party.incoming_steps.expected_write_tick_id(), TickId(3));
    assert_eq!(party.warning_about_zero_added_steps, 1);
}

#[test_log::test]
fn gap_in_predicted_steps_is_filled_with_forced_steps() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);
    let (participant_id, party_id, _) = connect_and_join(&mut logic, 1, &state);

    // Steps 0..2 then a jump to 5: ticks 3 and 4 must be forced.
    logic
        .update(
            1,
            Millis::new(0),
            &steps_request(
                participant_id,
                TickId(0),
                TickId(0),
                &[SampleStep::Jump, SampleStep::Jump, SampleStep::Jump],
            ),
            &state,
        )
        .expect("steps should be accepted");
    logic
        .update(
            1,
            Millis::new(0),
            &steps_request(participant_id, TickId(0), TickId(5), &[SampleStep::Nothing]),
            &state,
        )
        .expect("gapped steps should be accepted");

    let party = logic.session().parties.get(party_id).expect("party exists");
    assert_eq!(party.incoming_steps.expected_write_tick_id(), TickId(6));

    // The forced fill reached the authoritative timeline.
    let composed = logic
        .session()
        .authoritative_steps
        .get_exact(TickId(3))
        .expect("tick 3 was composed");
    assert_eq!(composed.get(&participant_id), Some(&Step::NotProvidedInTime));

    let participant = logic
        .session()
        .participants
        .get(participant_id)
        .expect("participant exists");
    assert_eq!(
        participant.incoming_steps.get_exact(TickId(5)),
        Some(&Step::Provided(SampleStep::Nothing))
    );
}

#[test_log::test]
fn a_too_large_gap_is_fatal_for_the_request() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);
    let (participant_id, _, _) = connect_and_join(&mut logic, 1, &state);

    let result = logic.update(
        1,
        Millis::new(0),
        &steps_request(participant_id, TickId(0), TickId(100), &[SampleStep::Jump]),
        &state,
    );
    assert!(result.is_err());
}

#[test_log::test]
fn session_full_is_reported_to_the_client() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);

    // Eight participants fill the configured capacity.
    let (_, _, _) = connect_and_join(&mut logic, 1, &state);
    logic.register_connection(2).expect("id should be free");
    logic
        .update(2, Millis::new(0), &connect_request(), &state)
        .expect("connect should pass");
    logic
        .update(2, Millis::new(0), &join_request(JoinGameKind::NoSecret, 7), &state)
        .expect("join should pass");
    assert_eq!(logic.session().participants.count(), 8);

    logic.register_connection(3).expect("id should be free");
    logic
        .update(3, Millis::new(0), &connect_request(), &state)
        .expect("connect should pass");
    let responses = logic
        .update(3, Millis::new(0), &join_request(JoinGameKind::NoSecret, 1), &state)
        .expect("refusal is a reply, not an error");
    assert!(matches!(
        responses[0],
        HostToClientCommands::JoinGameOutOfSlots(_)
    ));
}

#[test_log::test]
fn rejoin_with_secret_restores_the_party() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);
    let (participant_id, party_id, secret) = connect_and_join(&mut logic, 1, &state);

    logic
        .update(
            1,
            Millis::new(0),
            &steps_request(
                participant_id,
                TickId(0),
                TickId(0),
                &[
                    SampleStep::Jump,
                    SampleStep::Jump,
                    SampleStep::Jump,
                    SampleStep::Jump,
                    SampleStep::Jump,
                    SampleStep::Jump,
                ],
            ),
            &state,
        )
        .expect("steps should be accepted");
    let tip = logic.session().tick_id_to_produce();
    assert!(tip > TickId(0));

    // Transport drop; the party is waiting for its owner to come back.
    logic
        .session_mut()
        .parties
        .get_mut(party_id)
        .expect("party exists")
        .set_waiting_for_rejoin();

    // New transport connection, same client, presenting the party secret.
    logic.register_connection(2).expect("id should be free");
    logic
        .update(2, Millis::new(0), &connect_request(), &state)
        .expect("connect should pass");
    let responses = logic
        .update(
            2,
            Millis::new(0),
            &join_request(JoinGameKind::PartySecret(secret), 1),
            &state,
        )
        .expect("rejoin should pass");

    let HostToClientCommands::JoinGame(accepted) = &responses[0] else {
        panic!("expected a join accept");
    };
    assert_eq!(accepted.participants.0[0].participant_id, participant_id);
    assert_eq!(accepted.party_and_secret.party_id, party_id);

    let party = logic.session().parties.get(party_id).expect("party exists");
    assert_eq!(party.state, PartyState::Normal);
    assert_eq!(party.transport_id, Some(2));
    assert_eq!(party.incoming_steps.expected_write_tick_id(), tip);
    assert_eq!(party.incoming_steps.len(), 0);
}

#[test_log::test]
fn host_migration_prepares_waiting_parties() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);

    let prepared = [
        ParticipantId(0x02),
        ParticipantId(0x05),
        ParticipantId(0x07),
        ParticipantId(0x01),
    ];
    logic
        .host_migration(&prepared)
        .expect("migration should pass");

    assert_eq!(logic.session().parties.count(), 4);
    for party in logic.session().parties.iter() {
        assert_eq!(party.state, PartyState::WaitingForRejoin);
        assert_eq!(party.participant_ids.len(), 1);
    }

    // Free list holds exactly the ids that were not prepared.
    assert_eq!(
        logic.session().participants.free_id_count(),
        logic.session().participants.capacity() - prepared.len()
    );

    // The old owner of participant 0x05 reconnects.
    logic.register_connection(1).expect("id should be free");
    logic
        .update(1, Millis::new(0), &connect_request(), &state)
        .expect("connect should pass");
    let responses = logic
        .update(
            1,
            Millis::new(0),
            &join_request(
                JoinGameKind::HostMigrationParticipantId(ParticipantId(0x05)),
                1,
            ),
            &state,
        )
        .expect("migration rejoin should pass");

    let HostToClientCommands::JoinGame(accepted) = &responses[0] else {
        panic!("expected a join accept");
    };
    assert_eq!(
        accepted.participants.0[0].participant_id,
        ParticipantId(0x05)
    );

    let party_id = accepted.party_and_secret.party_id;
    let party = logic.session().parties.get(party_id).expect("party exists");
    assert_eq!(party.state, PartyState::Normal);
    assert_eq!(party.transport_id, Some(1));

    // A brand new client gets a fresh id, not one of the prepared ones.
    logic.register_connection(2).expect("id should be free");
    logic
        .update(2, Millis::new(0), &connect_request(), &state)
        .expect("connect should pass");
    let responses = logic
        .update(2, Millis::new(0), &join_request(JoinGameKind::NoSecret, 1), &state)
        .expect("join should pass");
    let HostToClientCommands::JoinGame(accepted) = &responses[0] else {
        panic!("expected a join accept");
    };
    let fresh_id = accepted.participants.0[0].participant_id;
    assert!(!prepared.contains(&fresh_id));
}

#[test_log::test]
fn ping_is_echoed_as_pong() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);

    logic.register_connection(1).expect("id should be free");
    logic
        .update(1, Millis::new(0), &connect_request(), &state)
        .expect("connect should pass");

    let responses = logic
        .update(1, Millis::new(0), &ClientToHostCommands::Ping(0x1234), &state)
        .expect("ping should pass");
    assert!(matches!(responses[0], HostToClientCommands::Pong(0x1234)));
}

#[test_log::test]
fn silent_party_dissolves_and_returns_its_participant() {
    let mut logic = new_logic();
    let state = TestStateProvider::new(TickId(0), vec![0xff]);
    let (_, party_id, _) = connect_and_join(&mut logic, 1, &state);
    let free_before = logic.session().participants.free_id_count();

    // Force the quality layer into its dissolve recommendation.
    {
        let party = logic
            .session_mut()
            .parties
            .get_mut(party_id)
            .expect("party exists");
        party.quality.provided_usable_step();
        party.quality.added_forced_steps(50);
    }

    // The delayed layer needs 180 sustained bad ticks before the party is
    // moved to waiting-for-rejoin, then the 32-tick rejoin window runs out.
    let mut destroyed_at = None;
    for tick in 0..(181 + 32 + 2) {
        let freed = logic.tick();
        if !freed.is_empty() {
            destroyed_at = Some(tick);
            break;
        }
        if tick == 200 {
            let party = logic.session().parties.get(party_id).expect("party exists");
            assert_eq!(party.state, PartyState::WaitingForRejoin);
        }
    }

    assert!(destroyed_at.is_some(), "party should have been destroyed");
    assert!(logic.session().parties.get(party_id).is_none());
    assert_eq!(
        logic.session().participants.free_id_count(),
        free_before + 1
    );
}
