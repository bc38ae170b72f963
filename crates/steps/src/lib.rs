/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
A bounded, gap-free FIFO of steps keyed by monotonically increasing
[`TickId`].

The buffer is the flow-control primitive of the lockstep host: writes are
only accepted at `expected_write_tick_id`, reads only happen at
`expected_read_tick_id`, and the window never holds more than
[`WINDOW_SIZE`] entries. Gaps are never left sparse; the caller fills them
with forced steps before pushing newer ticks.
*/

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use tick_id::TickId;

/// Maximum number of steps kept in flight in one buffer.
pub const WINDOW_SIZE: usize = 64;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StepInfo<T> {
    pub step: T,
    pub tick_id: TickId,
}

impl<T: Display> Display for StepInfo<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.tick_id, self.step)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StepBufferError {
    UnexpectedTickId { expected: TickId, encountered: TickId },
    WindowIsFull { window_size: usize },
}

/// Sliding window of `(TickId, T)` entries.
///
/// `expected_write_tick_id - expected_read_tick_id == len` at all times.
#[derive(Debug, Default)]
pub struct StepBuffer<T> {
    steps: VecDeque<StepInfo<T>>,
    expected_read_id: TickId,
    expected_write_id: TickId,
}

impl<T> StepBuffer<T> {
    #[must_use]
    pub fn new(initial_tick_id: TickId) -> Self {
        Self {
            steps: VecDeque::new(),
            expected_read_id: initial_tick_id,
            expected_write_id: initial_tick_id,
        }
    }

    /// Empties the buffer and points both cursors at `tick_id`.
    pub fn reinit(&mut self, tick_id: TickId) {
        self.steps.clear();
        self.expected_read_id = tick_id;
        self.expected_write_id = tick_id;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn front_tick_id(&self) -> Option<TickId> {
        self.steps.front().map(|info| info.tick_id)
    }

    #[must_use]
    pub const fn expected_read_tick_id(&self) -> TickId {
        self.expected_read_id
    }

    #[must_use]
    pub const fn expected_write_tick_id(&self) -> TickId {
        self.expected_write_id
    }

    /// How many steps a client skipped if its next incoming step is
    /// `first_incoming`. Zero when the stream is contiguous or behind.
    #[must_use]
    pub fn dropped_count(&self, first_incoming: TickId) -> usize {
        if first_incoming > self.expected_write_id {
            (first_incoming - self.expected_write_id) as usize
        } else {
            0
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepInfo<T>> {
        self.steps.iter()
    }
}

impl<T: Clone> StepBuffer<T> {
    /// Accepts a step only at the write cursor and only while the window
    /// has room.
    pub fn push(&mut self, tick_id: TickId, step: T) -> Result<(), StepBufferError> {
        if tick_id != self.expected_write_id {
            return Err(StepBufferError::UnexpectedTickId {
                expected: self.expected_write_id,
                encountered: tick_id,
            });
        }
        if self.steps.len() >= WINDOW_SIZE {
            return Err(StepBufferError::WindowIsFull {
                window_size: WINDOW_SIZE,
            });
        }

        self.steps.push_back(StepInfo {
            step,
            tick_id: self.expected_write_id,
        });
        self.expected_write_id += 1;
        Ok(())
    }

    /// Pops the oldest step, advancing the read cursor.
    pub fn pop(&mut self) -> Option<StepInfo<T>> {
        let info = self.steps.pop_front();
        if let Some(ref step_info) = info {
            debug_assert_eq!(step_info.tick_id, self.expected_read_id);
            self.expected_read_id += 1;
        }
        info
    }

    /// Non-advancing lookup of the step stored at exactly `tick_id`.
    #[must_use]
    pub fn get_exact(&self, tick_id: TickId) -> Option<&T> {
        if tick_id < self.expected_read_id || tick_id >= self.expected_write_id {
            return None;
        }
        let index = (tick_id - self.expected_read_id) as usize;
        self.steps.get(index).map(|info| &info.step)
    }

    /// Drops every step older than `tick_id`. Returns how many went away.
    pub fn discard_up_to(&mut self, tick_id: TickId) -> usize {
        let mut discarded = 0;
        while let Some(info) = self.steps.front() {
            if info.tick_id >= tick_id {
                break;
            }
            self.steps.pop_front();
            self.expected_read_id += 1;
            discarded += 1;
        }
        discarded
    }

    /// Clones a contiguous run starting at `start`. `None` if any tick of
    /// the run is outside the window.
    #[must_use]
    pub fn range_vec(&self, start: TickId, count: usize) -> Option<Vec<T>> {
        if start < self.expected_read_id {
            return None;
        }
        let offset = (start - self.expected_read_id) as usize;
        if offset + count > self.steps.len() {
            return None;
        }
        Some(
            self.steps
                .iter()
                .skip(offset)
                .take(count)
                .map(|info| info.step.clone())
                .collect(),
        )
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.steps.iter().map(|info| info.step.clone()).collect()
    }
}
