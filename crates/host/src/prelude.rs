/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
pub use crate::{
    connection::{TransportConnection, TransportPhase},
    err::HostError,
    server::{HostSetup, Server},
    transport::{MultiTransport, MAX_DATAGRAM_SIZE},
    update_quality::{UpdateQuality, UpdateQualityState},
};
pub use cadence_host_logic::{GameStateProvider, HostLogicError};
