/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::err::BlobError;
use crate::in_logic::Logic;
use crate::protocol::TransferId;
use crate::protocol_front::{
    AckChunkFrontData, ReceiverToSenderFrontCommands, SenderToReceiverFrontCommands,
};
use err_rs::{ErrorLevel, ErrorLevelProvider};
use log::{debug, trace};
use std::io;

#[derive(Debug)]
pub enum FrontLogicError {
    IoError(io::Error),
    BlobError(BlobError),
    UnknownTransferId(TransferId),
    ChunkSizeCanNotBeZero,
    NoTransferInProgress,
}

impl ErrorLevelProvider for FrontLogicError {
    fn error_level(&self) -> ErrorLevel {
        match self {
            Self::IoError(_)
            | Self::BlobError(_)
            | Self::UnknownTransferId(_)
            | Self::ChunkSizeCanNotBeZero
            | Self::NoTransferInProgress => ErrorLevel::Info,
        }
    }
}

#[derive(Debug)]
struct State {
    transfer_id: TransferId,
    logic: Logic,
}

/// Transfer-id aware receiver front. Restarts cleanly when the sender
/// begins a new transfer.
#[derive(Debug, Default)]
pub struct FrontLogic {
    state: Option<State>,
    should_reply_start_ack: bool,
}

impl FrontLogic {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: None,
            should_reply_start_ack: false,
        }
    }

    /// # Errors
    /// `FrontLogicError` when a chunk arrives before any start transfer, or
    /// when the chunk itself is malformed.
    pub fn receive(
        &mut self,
        command: &SenderToReceiverFrontCommands,
    ) -> Result<(), FrontLogicError> {
        match command {
            SenderToReceiverFrontCommands::StartTransfer(start) => {
                if self
                    .state
                    .as_ref()
                    .map_or(true, |state| state.transfer_id.0 != start.transfer_id)
                {
                    debug!("start transfer {}, preparing receive state", start.transfer_id);
                    if start.chunk_size == 0 {
                        Err(FrontLogicError::ChunkSizeCanNotBeZero)?;
                    }
                    self.state = Some(State {
                        transfer_id: TransferId(start.transfer_id),
                        logic: Logic::new(start.total_octet_size as usize, start.chunk_size),
                    });
                }
                self.should_reply_start_ack = true;
                Ok(())
            }
            SenderToReceiverFrontCommands::SetChunk(chunk) => {
                if let Some(state) = self.state.as_mut() {
                    trace!(
                        "received chunk {} (transfer {})",
                        chunk.data.chunk_index,
                        chunk.transfer_id.0
                    );
                    state
                        .logic
                        .receive(&chunk.data)
                        .map_err(FrontLogicError::BlobError)
                } else {
                    Err(FrontLogicError::UnknownTransferId(chunk.transfer_id))
                }
            }
        }
    }

    /// # Errors
    /// `FrontLogicError::NoTransferInProgress` before the first start
    /// transfer command.
    pub fn send(&mut self) -> Result<ReceiverToSenderFrontCommands, FrontLogicError> {
        let state = self
            .state
            .as_mut()
            .ok_or(FrontLogicError::NoTransferInProgress)?;

        if self.should_reply_start_ack {
            self.should_reply_start_ack = false;
            return Ok(ReceiverToSenderFrontCommands::AckStart(state.transfer_id.0));
        }

        Ok(ReceiverToSenderFrontCommands::AckChunk(AckChunkFrontData {
            transfer_id: state.transfer_id,
            data: state.logic.send(),
        }))
    }

    #[must_use]
    pub fn blob(&self) -> Option<&[u8]> {
        self.state.as_ref().and_then(|state| state.logic.blob())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state
            .as_ref()
            .map_or(false, |state| state.logic.is_complete())
    }
}
