/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Drop-old-datagrams filtering for an unreliable transport.

Each datagram carries a one-octet wrapping sequence number followed by the
`0xDD` marker octet. The receiver only accepts a datagram whose sequence is
equal to or a close successor of the expected one; anything older is
reported as [`DatagramOrderInError::WrongOrder`] and must be discarded by
the caller.
*/

use flood_rs::{ReadOctetStream, WriteOctetStream};
use std::ops::Sub;
use std::{fmt, io};

/// Written after the sequence octet on every ordered datagram.
pub const ORDERED_MARKER: u8 = 0xDD;

/// Sequence numbers more than this far ahead are treated as stale rather
/// than as a burst of losses.
const ACCEPTABLE_SEQUENCE_JUMP: u8 = 32;

#[derive(Debug)]
pub struct DatagramIdDiff(u8);

impl DatagramIdDiff {
    #[must_use]
    pub const fn is_successor(&self) -> bool {
        self.0 > 0 && self.0 <= ACCEPTABLE_SEQUENCE_JUMP
    }

    #[must_use]
    pub const fn is_equal_or_successor(&self) -> bool {
        self.0 <= ACCEPTABLE_SEQUENCE_JUMP
    }

    #[must_use]
    pub const fn inner(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct DatagramId(u8);

impl DatagramId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn inner(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    fn to_stream(self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.0)
    }

    fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self(stream.read_u8()?))
    }
}

impl Sub for DatagramId {
    type Output = DatagramIdDiff;
    fn sub(self, rhs: Self) -> DatagramIdDiff {
        DatagramIdDiff(rhs.0.wrapping_sub(self.0))
    }
}

impl fmt::Display for DatagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatagramId({:X})", self.0)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrderedOut {
    pub sequence_to_send: DatagramId,
}

impl OrderedOut {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sequence_to_send: DatagramId(0),
        }
    }

    /// Writes `sequence | 0xDD`. Call [`Self::commit`] once the datagram
    /// actually went out.
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        self.sequence_to_send.to_stream(stream)?;
        stream.write_u8(ORDERED_MARKER)
    }

    pub fn commit(&mut self) {
        self.sequence_to_send = self.sequence_to_send.next();
    }
}

#[derive(Debug)]
pub enum DatagramOrderInError {
    IoError(io::Error),
    WrongOrder {
        expected: DatagramId,
        received: DatagramId,
    },
    MissingMarker(u8),
}

impl From<io::Error> for DatagramOrderInError {
    fn from(e: io::Error) -> Self {
        Self::IoError(e)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrderedIn {
    expected_sequence: DatagramId,
}

impl OrderedIn {
    /// Reads and checks `sequence | 0xDD`, returning how many datagrams
    /// were skipped since the last accepted one.
    pub fn read_and_verify(
        &mut self,
        stream: &mut impl ReadOctetStream,
    ) -> Result<DatagramIdDiff, DatagramOrderInError> {
        let received = DatagramId::from_stream(stream)?;
        let marker = stream.read_u8()?;
        if marker != ORDERED_MARKER {
            return Err(DatagramOrderInError::MissingMarker(marker));
        }

        let diff = self.expected_sequence.sub(received);
        if diff.is_equal_or_successor() {
            self.expected_sequence = received.next();
            Ok(diff)
        } else {
            Err(DatagramOrderInError::WrongOrder {
                received,
                expected: self.expected_sequence,
            })
        }
    }
}
