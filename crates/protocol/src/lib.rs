/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
Wire protocol spoken between a lockstep client and the cadence host.

All payloads are encoded with `flood-rs` octet streams. The datagram
header in front of these commands (connection id, hash, ordered sequence,
client time) is owned by the host framing layer, not by this crate.
*/

use flood_rs::{Deserialize, ReadOctetStream, Serialize, WriteOctetStream};
use std::fmt;
use std::io::Result;

pub mod client_to_host;
pub mod host_to_client;
pub mod prelude;
pub mod serialize;

pub const PROTOCOL_VERSION: Version = Version::new(0, 0, 1);

/// Client-chosen identifier echoed back in responses so the client can
/// match replies to requests.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClientRequestId(pub u8);

impl fmt::Display for ClientRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({:X})", self.0)
    }
}

impl Serialize for ClientRequestId {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> Result<()> {
        stream.write_u8(self.0)
    }
}

impl Deserialize for ClientRequestId {
    fn deserialize(stream: &mut impl ReadOctetStream) -> Result<Self> {
        Ok(Self(stream.read_u8()?))
    }
}

/// Random value chosen by the client for a connect attempt. The host uses
/// it to make `ConnectRequest` idempotent per transport index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Nonce(pub u64);

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({:X})", self.0)
    }
}

impl Serialize for Nonce {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> Result<()> {
        stream.write_u64(self.0)
    }
}

impl Deserialize for Nonce {
    fn deserialize(stream: &mut impl ReadOctetStream) -> Result<Self> {
        Ok(Self(stream.read_u64()?))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> Result<()> {
        stream.write_u16(self.major)?;
        stream.write_u16(self.minor)?;
        stream.write_u16(self.patch)?;
        Ok(())
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> Result<Self> {
        Ok(Self {
            major: stream.read_u16()?,
            minor: stream.read_u16()?,
            patch: stream.read_u16()?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Secret handed out in the connect response; it seeds the datagram hash
/// for the connection's lifetime.
#[derive(PartialEq, Copy, Clone, Eq)]
pub struct ConnectionSecret {
    pub value: u64,
}

impl ConnectionSecret {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> Result<()> {
        stream.write_u64(self.value)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> Result<Self> {
        Ok(Self {
            value: stream.read_u64()?,
        })
    }
}

impl fmt::Display for ConnectionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection_secret: {:X}", self.value)
    }
}

impl fmt::Debug for ConnectionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection_secret: {:X}", self.value)
    }
}

/// Secret handed out when a party is created; presenting it again lets a
/// client rejoin its old seat after a transport drop.
#[derive(PartialEq, Copy, Clone, Eq, Hash)]
pub struct PartySecret {
    pub value: u64,
}

impl PartySecret {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> Result<()> {
        stream.write_u64(self.value)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> Result<Self> {
        Ok(Self {
            value: stream.read_u64()?,
        })
    }
}

impl fmt::Display for PartySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party_secret: {:X}", self.value)
    }
}

impl fmt::Debug for PartySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party_secret: {:X}", self.value)
    }
}
