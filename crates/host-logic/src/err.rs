/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_blob_stream::out_stream::OutStreamError;
use cadence_participant::{ParticipantId, PartyId};
use cadence_steps::StepBufferError;
use err_rs::{ErrorLevel, ErrorLevelProvider};
use std::io;

/// Wire-visible error codes. Everything else is internal.
pub const WIRE_ERR_SERIALIZE: i8 = -41;
pub const WIRE_ERR_DATAGRAM_FROM_DISCONNECTED_CONNECTION: i8 = -42;
pub const WIRE_ERR_OUT_OF_PARTICIPANT_MEMORY: i8 = -43;
pub const WIRE_ERR_SERIALIZE_VERSION: i8 = -44;
pub const WIRE_ERR_SESSION_FULL: i8 = -54;

#[derive(Debug)]
pub enum HostLogicError {
    UnknownConnectionId(u8),
    ConnectionIdAlreadyInUse(u8),
    UnknownPartyId(PartyId),
    UnknownPartyMember(ParticipantId),
    IllegalParticipantId(ParticipantId),
    ParticipantAlreadyInUse(ParticipantId),
    FreeListError(ParticipantId),
    SessionFull,
    OutOfPartySlots,
    NoPartyForConnection,
    PartyIsDissolved(PartyId),
    NeedConnectRequestFirst,
    WrongApplicationVersion,
    NoDownloadNow,
    TooManyDroppedSteps { dropped: usize },
    WrongLocalPlayerCount { expected: usize, requested: usize },
    GameStateTooLarge { octet_count: usize, capacity: usize },
    BlobStreamError(OutStreamError),
    StepBufferError(StepBufferError),
    IoError(io::Error),
}

impl ErrorLevelProvider for HostLogicError {
    fn error_level(&self) -> ErrorLevel {
        match self {
            Self::UnknownConnectionId(_)
            | Self::UnknownPartyMember(_)
            | Self::SessionFull
            | Self::OutOfPartySlots
            | Self::NoPartyForConnection
            | Self::TooManyDroppedSteps { .. }
            | Self::WrongLocalPlayerCount { .. } => ErrorLevel::Warning,
            Self::PartyIsDissolved(_)
            | Self::NeedConnectRequestFirst
            | Self::NoDownloadNow
            | Self::BlobStreamError(_)
            | Self::IoError(_) => ErrorLevel::Info,
            Self::ConnectionIdAlreadyInUse(_)
            | Self::UnknownPartyId(_)
            | Self::IllegalParticipantId(_)
            | Self::ParticipantAlreadyInUse(_)
            | Self::FreeListError(_)
            | Self::WrongApplicationVersion
            | Self::GameStateTooLarge { .. }
            | Self::StepBufferError(_) => ErrorLevel::Critical,
        }
    }
}

impl HostLogicError {
    /// Maps the error onto the negative code the wire format reserves for
    /// it. `None` for internal errors that never leave the host.
    #[must_use]
    pub const fn wire_code(&self) -> Option<i8> {
        match self {
            Self::IoError(_) | Self::TooManyDroppedSteps { .. } => Some(WIRE_ERR_SERIALIZE),
            Self::PartyIsDissolved(_) => Some(WIRE_ERR_DATAGRAM_FROM_DISCONNECTED_CONNECTION),
            Self::OutOfPartySlots => Some(WIRE_ERR_OUT_OF_PARTICIPANT_MEMORY),
            Self::WrongApplicationVersion => Some(WIRE_ERR_SERIALIZE_VERSION),
            Self::SessionFull => Some(WIRE_ERR_SESSION_FULL),
            _ => None,
        }
    }

    /// External errors are expected under adversarial or racy input; the
    /// offending datagram is dropped and the host carries on.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        self.wire_code().is_some()
    }
}

impl From<OutStreamError> for HostLogicError {
    fn from(err: OutStreamError) -> Self {
        Self::BlobStreamError(err)
    }
}

impl From<StepBufferError> for HostLogicError {
    fn from(err: StepBufferError) -> Self {
        Self::StepBufferError(err)
    }
}

impl From<io::Error> for HostLogicError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}
