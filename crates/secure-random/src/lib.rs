/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Random source used for connection and party secrets. The host never calls
the operating system directly; it goes through [`SecureRandom`] so tests can
inject a deterministic sequence.
*/

use getrandom::getrandom;

pub trait SecureRandom {
    fn random_u64(&mut self) -> u64;
}

/// Operating-system backed randomness.
#[derive(Debug, Default)]
pub struct GetRandom;

impl SecureRandom for GetRandom {
    fn random_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        getrandom(&mut buf).expect("failed to get random octets");
        u64::from_le_bytes(buf)
    }
}

/// Hands out a fixed sequence. Intended for tests.
#[derive(Debug)]
pub struct SequenceRandom {
    pub next: u64,
}

impl SecureRandom for SequenceRandom {
    fn random_u64(&mut self) -> u64 {
        let value = self.next;
        self.next = self.next.wrapping_add(1);
        value
    }
}
