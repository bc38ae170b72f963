/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/// Capacity of every id ring in the host. Also the upper bound for
/// connection and participant counts.
pub const ID_RING_CAPACITY: usize = 64;

#[derive(Debug, Eq, PartialEq)]
pub enum IdRingError {
    RingIsFull,
    RingIsEmpty,
}

/// Fixed-capacity FIFO ring of one-octet ids.
///
/// Freed ids go to the back of the queue, so an id is only reused after
/// every other free id has been handed out. That keeps participant and
/// connection ids stable while a client is away for a rejoin.
#[derive(Debug)]
pub struct IdRing {
    data: [u8; ID_RING_CAPACITY],
    head: usize,
    tail: usize,
    is_full: bool,
}

impl Default for IdRing {
    fn default() -> Self {
        Self::new()
    }
}

impl IdRing {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0; ID_RING_CAPACITY],
            head: 0,
            tail: 0,
            is_full: false,
        }
    }

    /// A ring pre-filled with `first..first + count`.
    #[must_use]
    pub fn with_range(first: u8, count: usize) -> Self {
        let mut ring = Self::new();
        for id in first..first + count as u8 {
            ring.push(id).expect("range fits in a fresh ring");
        }
        ring
    }

    pub fn push(&mut self, id: u8) -> Result<(), IdRingError> {
        if self.is_full {
            return Err(IdRingError::RingIsFull);
        }
        self.data[self.head] = id;
        self.head = (self.head + 1) % ID_RING_CAPACITY;
        self.is_full = self.head == self.tail;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u8, IdRingError> {
        if self.is_empty() {
            return Err(IdRingError::RingIsEmpty);
        }
        let id = self.data[self.tail];
        self.tail = (self.tail + 1) % ID_RING_CAPACITY;
        self.is_full = false;
        Ok(id)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head == self.tail && !self.is_full
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        if self.is_full {
            ID_RING_CAPACITY
        } else if self.head >= self.tail {
            self.head - self.tail
        } else {
            ID_RING_CAPACITY + self.head - self.tail
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.is_full = false;
    }
}
