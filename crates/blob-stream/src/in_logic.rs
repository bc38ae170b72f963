/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::err::BlobError;
use crate::in_stream::BlobStreamIn;
use crate::protocol::{AckChunkData, SetChunkData};
use crate::ChunkIndex;

/// Receiver logic for one transfer: stores chunks and produces acks.
#[derive(Debug)]
pub struct Logic {
    in_stream: BlobStreamIn,
}

impl Logic {
    #[must_use]
    pub fn new(octet_count: usize, chunk_size: u16) -> Self {
        Self {
            in_stream: BlobStreamIn::new(octet_count, chunk_size as usize),
        }
    }

    /// # Errors
    /// `BlobError` if the chunk is malformed or conflicts with stored data.
    #[allow(clippy::cast_possible_truncation)]
    pub fn receive(&mut self, chunk_data: &SetChunkData) -> Result<(), BlobError> {
        self.in_stream
            .set_chunk(chunk_data.chunk_index as ChunkIndex, &chunk_data.payload)
    }

    /// Builds the ack for the current receive state: the first missing
    /// chunk plus a mask for the 64 chunks after it.
    pub fn send(&mut self) -> AckChunkData {
        let waiting_for_chunk_index = self
            .in_stream
            .bit_array
            .first_unset_bit()
            .unwrap_or_else(|| self.in_stream.bit_array.bit_count());

        let receive_mask = self
            .in_stream
            .bit_array
            .atom_from_index(waiting_for_chunk_index + 1);

        AckChunkData {
            waiting_for_chunk_index: u32::try_from(waiting_for_chunk_index)
                .expect("chunk index fits in u32"),
            receive_mask_after_last: receive_mask,
        }
    }

    #[must_use]
    pub fn blob(&self) -> Option<&[u8]> {
        self.in_stream.blob()
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.in_stream.is_complete()
    }
}
