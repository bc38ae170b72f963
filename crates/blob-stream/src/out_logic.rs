/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::out_stream::{BlobStreamOut, OutStreamError};
use crate::protocol::{SetChunkData, TransferId};
use crate::protocol_front::SetChunkFrontData;
use monotonic_time_rs::Millis;
use std::time::Duration;

/// Splits a blob into fixed-size chunks and produces the chunk commands
/// that [`BlobStreamOut`] decides to send.
#[derive(Debug)]
pub struct Logic {
    out_stream: BlobStreamOut,
    blob: Vec<u8>,
    fixed_chunk_size: u16,
    transfer_id: TransferId,
}

impl Logic {
    /// # Errors
    /// `OutStreamError::BlobIsTooLarge` when the chunk count overflows u32.
    pub fn new(
        transfer_id: TransferId,
        fixed_chunk_size: u16,
        resend_duration: Duration,
        blob: &[u8],
    ) -> Result<Self, OutStreamError> {
        let chunk_count = blob.len().div_ceil(fixed_chunk_size as usize);
        let chunk_count = u32::try_from(chunk_count).map_err(OutStreamError::BlobIsTooLarge)?;
        Ok(Self {
            out_stream: BlobStreamOut::new(chunk_count, resend_duration),
            blob: blob.to_vec(),
            transfer_id,
            fixed_chunk_size,
        })
    }

    #[must_use]
    #[inline]
    fn octet_range(&self, index: u32) -> Option<(usize, usize)> {
        if index >= self.out_stream.chunk_count() {
            return None;
        }
        let start = index as usize * self.fixed_chunk_size as usize;
        let end = (start + self.fixed_chunk_size as usize).min(self.blob.len());
        Some((start, end))
    }

    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn send(&mut self, now: Millis, max_count: usize) -> Vec<SetChunkFrontData> {
        let indices = self.out_stream.send(now, max_count);
        indices
            .iter()
            .map(|chunk_index| {
                let (start, end) = self
                    .octet_range(*chunk_index)
                    .expect("indices from the out stream are in bounds");
                SetChunkFrontData {
                    transfer_id: self.transfer_id,
                    data: SetChunkData {
                        chunk_index: *chunk_index,
                        payload: self.blob[start..end].to_vec(),
                    },
                }
            })
            .collect()
    }

    /// # Errors
    /// `OutStreamError::ChunkIndexOutOfBounds` on a bogus ack.
    pub fn set_waiting_for_chunk_index(
        &mut self,
        waiting_for_index: usize,
        receive_mask: u64,
    ) -> Result<(), OutStreamError> {
        self.out_stream
            .set_waiting_for_chunk_index(waiting_for_index, receive_mask)
    }

    #[must_use]
    pub fn is_received_by_remote(&self) -> bool {
        self.out_stream.is_received_by_remote()
    }

    #[must_use]
    pub fn octet_size(&self) -> u32 {
        self.blob.len() as u32
    }

    #[must_use]
    pub const fn chunk_size(&self) -> u16 {
        self.fixed_chunk_size
    }

    #[must_use]
    pub const fn transfer_id(&self) -> TransferId {
        self.transfer_id
    }
}
