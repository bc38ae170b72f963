/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use monotonic_time_rs::Millis;
use std::time::Duration;

#[derive(Debug)]
pub enum OutStreamError {
    BlobIsTooLarge(std::num::TryFromIntError),
    ChunkIndexOutOfBounds { index: usize, chunk_count: u32 },
    UnexpectedStartTransfer,
}

/// Send-side bookkeeping for one chunk: when it was last sent and whether
/// the remote confirmed it.
#[derive(Clone, Debug, Eq, PartialEq)]
struct ChunkSendEntry {
    last_sent_at: Option<Millis>,
    received_by_remote: bool,
}

/// Tracks which chunks still need to go out and when they may be resent.
///
/// The receiver drives the window with acks: a waiting-for index (every
/// chunk before it is confirmed) and a 64-bit mask covering the chunks
/// right after it.
#[derive(Debug)]
pub struct BlobStreamOut {
    entries: Vec<ChunkSendEntry>,
    waiting_for_index: usize,
    resend_cursor: usize,
    resend_duration: Duration,
}

impl BlobStreamOut {
    #[must_use]
    pub fn new(chunk_count: u32, resend_duration: Duration) -> Self {
        Self {
            entries: vec![
                ChunkSendEntry {
                    last_sent_at: None,
                    received_by_remote: false,
                };
                chunk_count as usize
            ],
            waiting_for_index: 0,
            resend_cursor: 0,
            resend_duration,
        }
    }

    #[must_use]
    pub fn chunk_count(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Applies a receiver ack. Everything before `waiting_for_index` is
    /// confirmed; bit `i` of `receive_mask` confirms chunk
    /// `waiting_for_index + 1 + i`.
    pub fn set_waiting_for_chunk_index(
        &mut self,
        waiting_for_index: usize,
        receive_mask: u64,
    ) -> Result<(), OutStreamError> {
        if waiting_for_index > self.entries.len() {
            return Err(OutStreamError::ChunkIndexOutOfBounds {
                index: waiting_for_index,
                chunk_count: self.chunk_count(),
            });
        }

        self.waiting_for_index = waiting_for_index;
        for entry in self.entries.iter_mut().take(waiting_for_index) {
            entry.received_by_remote = true;
        }
        for bit in 0..64usize {
            if receive_mask & (1 << bit) == 0 {
                continue;
            }
            if let Some(entry) = self.entries.get_mut(waiting_for_index + 1 + bit) {
                entry.received_by_remote = true;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_received_by_remote(&self) -> bool {
        self.waiting_for_index >= self.entries.len()
    }

    fn is_due(&self, index: usize, now: Millis) -> bool {
        let entry = &self.entries[index];
        if entry.received_by_remote {
            return false;
        }
        entry.last_sent_at.map_or(true, |sent_at| {
            u128::from((now - sent_at).as_millis()) >= self.resend_duration.as_millis()
        })
    }

    /// Picks up to `max_count` chunk indices to send now: first everything
    /// due from the waiting-for index, then a round-robin fill so every
    /// chunk gets airtime even before acks arrive.
    pub fn send(&mut self, now: Millis, max_count: usize) -> Vec<u32> {
        let chunk_count = self.entries.len();
        let mut indices = Vec::new();

        for index in self.waiting_for_index..chunk_count {
            if indices.len() >= max_count {
                break;
            }
            if self.is_due(index, now) {
                indices.push(index);
            }
        }

        if indices.len() < max_count && chunk_count > 0 {
            for _ in 0..chunk_count {
                if indices.len() >= max_count {
                    break;
                }
                let candidate = self.resend_cursor;
                self.resend_cursor = (self.resend_cursor + 1) % chunk_count;
                if !indices.contains(&candidate) && self.is_due(candidate, now) {
                    indices.push(candidate);
                }
            }
        }

        for index in &indices {
            self.entries[*index].last_sent_at = Some(now);
        }

        indices.iter().map(|index| *index as u32).collect()
    }
}
