/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_host_logic::HostLogicError;
use cadence_ordered_datagram::DatagramOrderInError;
use datagram_chunker::DatagramChunkerError;
use err_rs::{ErrorLevel, ErrorLevelProvider};
use std::io;

#[derive(Debug)]
pub enum HostError {
    InvalidSetup(&'static str),
    ConnectionNotFound(u8),
    ConnectionDisconnected(u8),
    WrongTransportIndex { expected: u8, received: u8 },
    HashMismatch,
    OutOfOrderDatagram(DatagramOrderInError),
    UnexpectedOutOfBandCommand,
    NoFreeTransportConnections,
    DatagramTooLarge { octet_count: usize },
    HostIsTooSlow,
    Logic(HostLogicError),
    DatagramChunker(DatagramChunkerError),
    IoError(io::Error),
}

impl ErrorLevelProvider for HostError {
    fn error_level(&self) -> ErrorLevel {
        match self {
            Self::ConnectionNotFound(_)
            | Self::ConnectionDisconnected(_)
            | Self::WrongTransportIndex { .. }
            | Self::HashMismatch
            | Self::OutOfOrderDatagram(_)
            | Self::UnexpectedOutOfBandCommand
            | Self::NoFreeTransportConnections
            | Self::IoError(_)
            | Self::DatagramChunker(_) => ErrorLevel::Info,
            Self::DatagramTooLarge { .. } => ErrorLevel::Warning,
            Self::InvalidSetup(_) | Self::HostIsTooSlow => ErrorLevel::Critical,
            Self::Logic(err) => err.error_level(),
        }
    }
}

impl HostError {
    /// Errors expected under packet loss, reordering or adversarial input.
    /// The datagram is dropped and the host keeps running.
    #[must_use]
    pub fn is_external(&self) -> bool {
        match self {
            Self::ConnectionNotFound(_)
            | Self::ConnectionDisconnected(_)
            | Self::WrongTransportIndex { .. }
            | Self::HashMismatch
            | Self::OutOfOrderDatagram(_)
            | Self::UnexpectedOutOfBandCommand
            | Self::NoFreeTransportConnections
            | Self::IoError(_)
            | Self::DatagramChunker(_) => true,
            Self::DatagramTooLarge { .. } | Self::InvalidSetup(_) | Self::HostIsTooSlow => false,
            Self::Logic(err) => err.is_external(),
        }
    }
}

impl From<HostLogicError> for HostError {
    fn from(err: HostLogicError) -> Self {
        Self::Logic(err)
    }
}

impl From<DatagramChunkerError> for HostError {
    fn from(err: DatagramChunkerError) -> Self {
        Self::DatagramChunker(err)
    }
}

impl From<DatagramOrderInError> for HostError {
    fn from(err: DatagramOrderInError) -> Self {
        Self::OutOfOrderDatagram(err)
    }
}

impl From<io::Error> for HostError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}
