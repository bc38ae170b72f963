/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Participant identity for a deterministic lockstep session.

A participant is one player slot in the game. Its id is a single octet that
stays stable for the lifetime of the session, including across disconnects
and host migration.
*/

use flood_rs::{Deserialize, ReadOctetStream, Serialize, WriteOctetStream};
use std::fmt::Display;

/// One player slot in the session, stable for the session lifetime.
#[derive(PartialEq, Eq, Copy, Ord, Hash, Clone, Debug, PartialOrd)]
pub struct ParticipantId(pub u8);

impl Serialize for ParticipantId {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> std::io::Result<()> {
        stream.write_u8(self.0)
    }
}

impl Deserialize for ParticipantId {
    fn deserialize(stream: &mut impl ReadOctetStream) -> std::io::Result<Self> {
        Ok(Self(stream.read_u8()?))
    }
}

impl Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "participant({})", self.0)
    }
}

/// A party is one client's seat in the game. It can hold several
/// participants for local multiplayer.
#[derive(PartialEq, Eq, Copy, Ord, Hash, Clone, Debug, PartialOrd)]
pub struct PartyId(pub u8);

impl Serialize for PartyId {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> std::io::Result<()> {
        stream.write_u8(self.0)
    }
}

impl Deserialize for PartyId {
    fn deserialize(stream: &mut impl ReadOctetStream) -> std::io::Result<Self> {
        Ok(Self(stream.read_u8()?))
    }
}

impl Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "party({})", self.0)
    }
}
