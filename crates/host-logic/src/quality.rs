/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Connection quality tracking for a party.

The raw layer counts steps the composer had to force versus steps the
client actually provided. The delayed layer adds hysteresis on top so one
bad patch of network weather does not immediately cost the client its seat.
*/

use cadence_participant::PartyId;
use log::info;

/// Forced steps in a row tolerated once the client has delivered anything.
const FORCED_STEPS_THRESHOLD: usize = 8;
/// A client that has never delivered gets a much longer leash; it may
/// still be downloading the game state.
const FORCED_STEPS_THRESHOLD_BEFORE_FIRST_ACCEPT: usize = 180;

/// Ticks the raw layer must keep recommending a disconnect before the
/// party is actually moved to waiting-for-rejoin.
const DISSOLVE_RECOMMEND_THRESHOLD: usize = 180;

const DISSOLVE_LOG_INTERVAL: usize = 60;

#[derive(Debug, Default)]
pub struct ConnectionQuality {
    pub forced_step_in_row: usize,
    pub provided_steps_in_row: usize,
    pub added_steps_to_buffer: usize,
    pub has_added_first_accepted_steps: bool,
}

impl ConnectionQuality {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.forced_step_in_row = 0;
        self.provided_steps_in_row = 0;
        self.added_steps_to_buffer = 0;
        self.has_added_first_accepted_steps = false;
    }

    /// A step from this party was accepted into an authoritative step.
    pub fn provided_usable_step(&mut self) {
        self.forced_step_in_row = 0;
        self.provided_steps_in_row += 1;
        self.has_added_first_accepted_steps = true;
        self.added_steps_to_buffer = 0;
    }

    /// Steps were accepted into the party's incoming buffer.
    pub fn added_steps_to_buffer(&mut self, count: usize) {
        self.added_steps_to_buffer += count;
    }

    /// The composer had to force steps for this party.
    pub fn added_forced_steps(&mut self, count: usize) {
        self.provided_steps_in_row = 0;
        self.forced_step_in_row += count;
    }

    #[must_use]
    pub const fn is_failing_to_provide_steps_in_time(&self) -> bool {
        let threshold = if self.has_added_first_accepted_steps {
            FORCED_STEPS_THRESHOLD
        } else {
            FORCED_STEPS_THRESHOLD_BEFORE_FIRST_ACCEPT
        };
        self.forced_step_in_row >= threshold
    }
}

/// Hysteresis on top of [`ConnectionQuality`]: the raw recommendation has
/// to persist before a dissolve is actually recommended, and a recovering
/// connection works its counter back down.
#[derive(Debug, Default)]
pub struct DelayedQuality {
    pub impeding_disconnect_counter: usize,
}

impl DelayedQuality {
    pub fn reset(&mut self) {
        self.impeding_disconnect_counter = 0;
    }

    /// Returns `true` when the party should be kept, `false` when the
    /// quality layer recommends a dissolve.
    pub fn tick(&mut self, quality: &ConnectionQuality, party_id: PartyId) -> bool {
        if quality.is_failing_to_provide_steps_in_time() {
            if self.impeding_disconnect_counter == 0 {
                info!(
                    "{party_id}: quality recommended dissolve for the first time ({} forced steps in a row)",
                    quality.forced_step_in_row
                );
            }
            self.impeding_disconnect_counter += 1;
            if self.impeding_disconnect_counter > DISSOLVE_RECOMMEND_THRESHOLD {
                info!(
                    "{party_id}: recommending dissolve (counter:{})",
                    self.impeding_disconnect_counter
                );
                return false;
            }
            if self.impeding_disconnect_counter % DISSOLVE_LOG_INTERVAL == 0 {
                info!(
                    "{party_id}: bad quality, considering dissolving (counter:{})",
                    self.impeding_disconnect_counter
                );
            }
        } else if self.impeding_disconnect_counter > 0 {
            self.impeding_disconnect_counter -= 1;
            if self.impeding_disconnect_counter == 0 {
                info!("{party_id}: connection has stabilized again");
            } else if self.impeding_disconnect_counter % DISSOLVE_LOG_INTERVAL == 0 {
                info!(
                    "{party_id}: connection stabilizing (counter:{})",
                    self.impeding_disconnect_counter
                );
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_steps_trip_the_raw_predicate() {
        let mut quality = ConnectionQuality::new();
        quality.provided_usable_step();

        quality.added_forced_steps(7);
        assert!(!quality.is_failing_to_provide_steps_in_time());
        quality.added_forced_steps(1);
        assert!(quality.is_failing_to_provide_steps_in_time());

        quality.provided_usable_step();
        assert!(!quality.is_failing_to_provide_steps_in_time());
    }

    #[test]
    fn slow_joiner_gets_a_longer_leash() {
        let mut quality = ConnectionQuality::new();
        quality.added_forced_steps(179);
        assert!(!quality.is_failing_to_provide_steps_in_time());
        quality.added_forced_steps(1);
        assert!(quality.is_failing_to_provide_steps_in_time());
    }

    #[test]
    fn delayed_layer_needs_sustained_badness() {
        let mut quality = ConnectionQuality::new();
        quality.provided_usable_step();
        quality.added_forced_steps(50);

        let mut delayed = DelayedQuality::default();
        for _ in 0..180 {
            assert!(delayed.tick(&quality, PartyId(0)));
        }
        assert!(!delayed.tick(&quality, PartyId(0)));
    }

    #[test]
    fn delayed_layer_recovers() {
        let mut quality = ConnectionQuality::new();
        quality.provided_usable_step();
        quality.added_forced_steps(50);

        let mut delayed = DelayedQuality::default();
        for _ in 0..100 {
            delayed.tick(&quality, PartyId(0));
        }

        quality.provided_usable_step();
        for _ in 0..100 {
            assert!(delayed.tick(&quality, PartyId(0)));
        }
        assert_eq!(delayed.impeding_disconnect_counter, 0);
    }
}
