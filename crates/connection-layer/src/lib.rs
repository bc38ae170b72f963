/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
The connection layer binds every non-out-of-band datagram to the secret
handed out in the connect response. The header is
`connection_id | murmur3(payload, seed)`, where the seed is derived from the
connection secret. A datagram whose hash does not match is silently
discarded by the host; it is most likely stale or forged.

Connection id zero marks an out-of-band datagram which carries no hash.
*/

use flood_rs::{ReadOctetStream, WriteOctetStream};
use mash_rs::murmur3_32;
use std::io;

/// Seed for the datagram hash, derived from the connection secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSecretSeed(pub u32);

#[derive(PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct ConnectionId {
    pub value: u8,
}

impl ConnectionId {
    pub fn to_stream(self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.value)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            value: stream.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLayer {
    pub connection_id: ConnectionId,
    pub murmur3_hash: u32,
}

/// Parsed prefix of an incoming datagram.
#[derive(Debug, Clone, Copy)]
pub enum ConnectionLayerMode {
    OutOfBand,
    Connection(ConnectionLayer),
}

impl ConnectionLayerMode {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        match self {
            Self::OutOfBand => ConnectionId::default().to_stream(stream),
            Self::Connection(layer) => {
                layer.connection_id.to_stream(stream)?;
                stream.write_u32(layer.murmur3_hash)
            }
        }
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let connection_id = ConnectionId::from_stream(stream)?;
        let mode = match connection_id.value {
            0 => Self::OutOfBand,
            _ => Self::Connection(ConnectionLayer {
                connection_id,
                murmur3_hash: stream.read_u32()?,
            }),
        };
        Ok(mode)
    }
}

/// Writes the connection header for `payload`. The payload itself is
/// appended by the caller after this returns, which is why the hash can be
/// computed up front.
pub fn write_to_stream(
    stream: &mut impl WriteOctetStream,
    connection_id: ConnectionId,
    seed: ConnectionSecretSeed,
    payload: &[u8],
) -> io::Result<()> {
    let calculated_hash = murmur3_32(payload, seed.0);
    ConnectionLayerMode::Connection(ConnectionLayer {
        connection_id,
        murmur3_hash: calculated_hash,
    })
    .to_stream(stream)
}

/// Checks the received hash against the payload that followed the header.
pub fn verify_hash(
    expected_hash: u32,
    seed: ConnectionSecretSeed,
    payload: &[u8],
) -> io::Result<()> {
    let calculated_hash = murmur3_32(payload, seed.0);
    if calculated_hash == expected_hash {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("hash mismatch {calculated_hash:x} vs {expected_hash:x}"),
        ))
    }
}
