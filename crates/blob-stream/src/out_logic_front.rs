/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::out_logic::Logic;
use crate::out_stream::OutStreamError;
use crate::protocol::{StartTransferData, TransferId};
use crate::protocol_front::{ReceiverToSenderFrontCommands, SenderToReceiverFrontCommands};
use log::{debug, trace};
use monotonic_time_rs::Millis;
use std::time::Duration;

/// Number of chunks pushed out per send opportunity.
pub const CHUNK_BURST_COUNT: usize = 4;

#[derive(Debug)]
pub enum Phase {
    StartTransfer,
    Transfer,
}

/// Drives one outgoing transfer through its start handshake and the chunk
/// phase.
#[derive(Debug)]
pub struct OutLogicFront {
    out_stream: Logic,
    phase: Phase,
    transfer_id: TransferId,
}

impl OutLogicFront {
    /// # Errors
    /// `OutStreamError` if the blob is too large.
    pub fn new(
        transfer_id: TransferId,
        fixed_chunk_size: u16,
        resend_duration: Duration,
        blob: &[u8],
    ) -> Result<Self, OutStreamError> {
        Ok(Self {
            out_stream: Logic::new(transfer_id, fixed_chunk_size, resend_duration, blob)?,
            phase: Phase::StartTransfer,
            transfer_id,
        })
    }

    /// # Errors
    /// `OutStreamError` on a bogus chunk ack.
    pub fn receive(
        &mut self,
        command: &ReceiverToSenderFrontCommands,
    ) -> Result<(), OutStreamError> {
        match self.phase {
            Phase::StartTransfer => {
                if let ReceiverToSenderFrontCommands::AckStart(ack_transfer_id) = command {
                    if self.transfer_id.0 == *ack_transfer_id {
                        debug!("ack for transfer {ack_transfer_id}, moving to chunk phase");
                        self.phase = Phase::Transfer;
                    } else {
                        debug!("ack start for unknown transfer {ack_transfer_id}, ignoring");
                    }
                }
            }
            Phase::Transfer => match command {
                ReceiverToSenderFrontCommands::AckChunk(ack_chunk) => {
                    if ack_chunk.transfer_id != self.transfer_id {
                        debug!(
                            "chunk ack for unknown transfer {}, ignoring",
                            ack_chunk.transfer_id.0
                        );
                        return Ok(());
                    }
                    self.out_stream.set_waiting_for_chunk_index(
                        ack_chunk.data.waiting_for_chunk_index as usize,
                        ack_chunk.data.receive_mask_after_last,
                    )?;
                    if self.out_stream.is_received_by_remote() {
                        trace!("transfer {} fully received by remote", self.transfer_id.0);
                    }
                }
                ReceiverToSenderFrontCommands::AckStart(_) => {}
            },
        }
        Ok(())
    }

    /// # Errors
    /// `OutStreamError::UnexpectedStartTransfer` never in practice; kept
    /// for parity with receive.
    pub fn send(
        &mut self,
        now: Millis,
    ) -> Result<Vec<SenderToReceiverFrontCommands>, OutStreamError> {
        match self.phase {
            Phase::StartTransfer => {
                debug!("send start transfer {}", self.transfer_id.0);
                let mut commands = vec![SenderToReceiverFrontCommands::StartTransfer(
                    StartTransferData {
                        transfer_id: self.transfer_id.0,
                        total_octet_size: self.out_stream.octet_size(),
                        chunk_size: self.out_stream.chunk_size(),
                    },
                )];
                // Datagram loss is rare, so the first chunks ride along
                // with the descriptor instead of waiting for the ack.
                commands.extend(
                    self.out_stream
                        .send(now, CHUNK_BURST_COUNT)
                        .into_iter()
                        .map(SenderToReceiverFrontCommands::SetChunk),
                );
                Ok(commands)
            }
            Phase::Transfer => {
                let set_chunks: Vec<_> = self
                    .out_stream
                    .send(now, CHUNK_BURST_COUNT)
                    .into_iter()
                    .map(SenderToReceiverFrontCommands::SetChunk)
                    .collect();
                for set_chunk in &set_chunks {
                    trace!("sending {set_chunk}");
                }
                Ok(set_chunks)
            }
        }
    }

    #[must_use]
    pub fn is_received_by_remote(&self) -> bool {
        self.out_stream.is_received_by_remote()
    }

    #[must_use]
    pub const fn transfer_id(&self) -> TransferId {
        self.out_stream.transfer_id()
    }
}
