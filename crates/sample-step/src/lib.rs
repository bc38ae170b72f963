/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */

/*!
A tiny application step type used by the test suites. A real game brings
its own step type; the host only requires octet-stream serialization.
*/

use flood_rs::prelude::*;
use std::fmt::{Display, Formatter};
use std::io;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SampleStep {
    Nothing,
    MoveLeft(i16),
    MoveRight(i16),
    Jump,
}

impl Display for SampleStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nothing => write!(f, "nothing"),
            Self::MoveLeft(amount) => write!(f, "move left {amount}"),
            Self::MoveRight(amount) => write!(f, "move right {amount}"),
            Self::Jump => write!(f, "jump"),
        }
    }
}

impl Serialize for SampleStep {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        match self {
            Self::Nothing => stream.write_u8(0x00),
            Self::MoveLeft(amount) => {
                stream.write_u8(0x01)?;
                stream.write_i16(*amount)
            }
            Self::MoveRight(amount) => {
                stream.write_u8(0x02)?;
                stream.write_i16(*amount)
            }
            Self::Jump => stream.write_u8(0x03),
        }
    }
}

impl Deserialize for SampleStep {
    fn deserialize(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let octet = stream.read_u8()?;
        Ok(match octet {
            0x00 => Self::Nothing,
            0x01 => Self::MoveLeft(stream.read_i16()?),
            0x02 => Self::MoveRight(stream.read_i16()?),
            0x03 => Self::Jump,
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid sample step",
            ))?,
        })
    }
}
