/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Watchdog for the host's own tick cadence. A host that cannot keep its tick
time is worse than a dead one for lockstep clients, so once the measured
tick delta or its rolling average stays over the target for long enough,
`update` starts failing and the embedder should trigger a host migration.
*/

use crate::err::HostError;
use log::warn;
use metricator::AggregateMetric;
use monotonic_time_rs::Millis;

const FAILED_TICK_THRESHOLD: usize = 60;
const FAILED_AVERAGE_THRESHOLD: usize = 50;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UpdateQualityState {
    Working,
    FailedTickTime,
    FailedAverageTickTime,
}

#[derive(Debug)]
pub struct UpdateQuality {
    target_tick_ms: u64,
    last_time: Option<Millis>,
    measured_delta: AggregateMetric<u16>,
    delta_failed_in_a_row: usize,
    average_failed_in_a_row: usize,
    state: UpdateQualityState,
}

impl UpdateQuality {
    #[must_use]
    pub fn new(target_tick_ms: u64) -> Self {
        Self {
            target_tick_ms,
            last_time: None,
            measured_delta: AggregateMetric::<u16>::new(10).expect("window size should be ok"),
            delta_failed_in_a_row: 0,
            average_failed_in_a_row: 0,
            state: UpdateQualityState::Working,
        }
    }

    pub fn reinit(&mut self) {
        self.last_time = None;
        self.measured_delta = AggregateMetric::<u16>::new(10).expect("window size should be ok");
        self.delta_failed_in_a_row = 0;
        self.average_failed_in_a_row = 0;
        self.state = UpdateQualityState::Working;
    }

    #[must_use]
    pub const fn state(&self) -> UpdateQualityState {
        self.state
    }

    /// Measures the delta since the previous tick and fails the host when
    /// it has been too slow for too long.
    pub fn tick(&mut self, now: Millis) -> Result<(), HostError> {
        if self.state != UpdateQualityState::Working {
            return Err(HostError::HostIsTooSlow);
        }

        if let Some(last_time) = self.last_time {
            let delta_ms = (now - last_time).as_millis();
            self.measured_delta
                .add(delta_ms.min(u64::from(u16::MAX)) as u16);

            if delta_ms > self.target_tick_ms {
                self.delta_failed_in_a_row += 1;
            } else {
                self.delta_failed_in_a_row = 0;
            }

            if let Some(values) = self.measured_delta.values() {
                if values.avg as u64 > self.target_tick_ms {
                    self.average_failed_in_a_row += 1;
                } else {
                    self.average_failed_in_a_row = 0;
                }
            }
        }
        self.last_time = Some(now);

        if self.delta_failed_in_a_row > FAILED_TICK_THRESHOLD {
            warn!("failed to keep a stable tick rate, stopping host");
            self.state = UpdateQualityState::FailedTickTime;
            return Err(HostError::HostIsTooSlow);
        }
        if self.average_failed_in_a_row > FAILED_AVERAGE_THRESHOLD {
            warn!("failed to keep a stable average tick rate, stopping host");
            self.state = UpdateQualityState::FailedAverageTickTime;
            return Err(HostError::HostIsTooSlow);
        }

        Ok(())
    }
}
