/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
pub use crate::{
    client_to_host::{
        ClientToHostCommands, ConnectRequest, DownloadGameStateRequest, JoinGameKind,
        JoinGameRequest, JoinPlayerRequest, JoinPlayerRequests, StepsAck, StepsRequest,
    },
    host_to_client::{
        AuthoritativeStepRanges, ConnectionAccepted, DownloadGameStateResponse, GameStepResponse,
        GameStepResponseHeader, HostToClientCommands, JoinGameAccepted, JoinGameParticipant,
        JoinGameParticipants, JoinGameRefused, PartyAndSecret,
    },
    serialize::CombinedSteps,
    ClientRequestId, ConnectionSecret, Nonce, PartySecret, Version, PROTOCOL_VERSION,
};
