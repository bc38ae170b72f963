/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
The step marker codec shared by predicted and authoritative timelines.

Every entry in a composed authoritative step is tagged with a marker octet.
Most of the time it is [`Step::Provided`] carrying the application payload,
but the host can also synthesise steps for participants that did not deliver
in time, and it announces a participant's first contributed step with a
[`Step::Joined`] marker so late consumers of the timeline can tell joiners
apart from players that were present from the start.
*/

use cadence_participant::PartyId;
use flood_rs::prelude::*;
use std::fmt::{Display, Formatter};
use std::io;

/// Extra information carried by the one-shot join marker.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct JoinedMeta {
    pub party_id: PartyId,
}

impl Serialize for JoinedMeta {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        self.party_id.serialize(stream)
    }
}

impl Deserialize for JoinedMeta {
    fn deserialize(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            party_id: PartyId::deserialize(stream)?,
        })
    }
}

// Clone is needed since steps live in collections (pending buffers and the
// authoritative window), Eq and PartialEq for tests, Debug for output.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Step<T> {
    /// The participant did not provide a step in time; the host forced one.
    NotProvidedInTime,
    /// Forced while the participant's party is waiting for a rejoin.
    WaitingForRejoin,
    /// First step this participant ever contributed.
    Joined(JoinedMeta, T),
    Left,
    /// A normal step provided by the client.
    Provided(T),
}

impl<T> Step<T> {
    #[must_use]
    pub const fn to_octet(&self) -> u8 {
        match self {
            Self::NotProvidedInTime => 0x01,
            Self::WaitingForRejoin => 0x02,
            Self::Joined(..) => 0x03,
            Self::Left => 0x04,
            Self::Provided(_) => 0x05,
        }
    }

    /// The application payload, if the marker carries one.
    pub const fn payload(&self) -> Option<&T> {
        match self {
            Self::Joined(_, payload) | Self::Provided(payload) => Some(payload),
            _ => None,
        }
    }
}

impl<T: Display> Display for Step<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotProvidedInTime => write!(f, "NotProvidedInTime"),
            Self::WaitingForRejoin => write!(f, "WaitingForRejoin"),
            Self::Joined(meta, payload) => write!(f, "Joined({}, {payload})", meta.party_id),
            Self::Left => write!(f, "Left"),
            Self::Provided(payload) => write!(f, "Provided({payload})"),
        }
    }
}

impl<T: Serialize> Serialize for Step<T> {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.to_octet())?;
        match self {
            Self::Joined(meta, payload) => {
                meta.serialize(stream)?;
                payload.serialize(stream)
            }
            Self::Provided(payload) => payload.serialize(stream),
            _ => Ok(()),
        }
    }
}

impl<T: Deserialize> Deserialize for Step<T> {
    fn deserialize(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let marker = stream.read_u8()?;
        let step = match marker {
            0x01 => Self::NotProvidedInTime,
            0x02 => Self::WaitingForRejoin,
            0x03 => Self::Joined(JoinedMeta::deserialize(stream)?, T::deserialize(stream)?),
            0x04 => Self::Left,
            0x05 => Self::Provided(T::deserialize(stream)?),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown step marker 0x{marker:02X}"),
            ))?,
        };
        Ok(step)
    }
}
