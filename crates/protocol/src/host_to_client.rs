/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::serialize::{AuthoritativeStepRange, CombinedSteps};
use crate::{ClientRequestId, ConnectionSecret, PartySecret};
use cadence_blob_stream::prelude::SenderToReceiverFrontCommands;
use cadence_participant::{ParticipantId, PartyId};
use flood_rs::{Deserialize, ReadOctetStream, Serialize, WriteOctetStream};
use io::ErrorKind;
use log::trace;
use std::fmt::{Debug, Display, Formatter};
use std::io;
use tick_id::TickId;

#[repr(u8)]
pub enum HostToClientCommand {
    GameStep = 0x08,
    JoinGame = 0x09,
    JoinGameOutOfSlots = 0x0A,
    DownloadGameState = 0x0B,
    BlobStreamChannel = 0x0C,
    Connect = 0x0D,
    Pong = 0x0E,
}

impl TryFrom<u8> for HostToClientCommand {
    type Error = io::Error;

    fn try_from(value: u8) -> io::Result<Self> {
        Ok(match value {
            0x08 => Self::GameStep,
            0x09 => Self::JoinGame,
            0x0A => Self::JoinGameOutOfSlots,
            0x0B => Self::DownloadGameState,
            0x0C => Self::BlobStreamChannel,
            0x0D => Self::Connect,
            0x0E => Self::Pong,
            _ => Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("unknown host to client command 0x{value:0X}"),
            ))?,
        })
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct TickIdUtil;

impl TickIdUtil {
    pub fn to_stream(tick_id: TickId, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u32(tick_id.0)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<TickId> {
        Ok(TickId(stream.read_u32()?))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct DownloadGameStateResponse {
    pub client_request: u8,
    pub tick_id: TickId,
    pub blob_stream_channel: u16,
}

impl Display for DownloadGameStateResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "download game state response {} {} {}",
            self.client_request, self.tick_id, self.blob_stream_channel
        )
    }
}

impl DownloadGameStateResponse {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.client_request)?;
        TickIdUtil::to_stream(self.tick_id, stream)?;
        stream.write_u16(self.blob_stream_channel)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            client_request: stream.read_u8()?,
            tick_id: TickIdUtil::from_stream(stream)?,
            blob_stream_channel: stream.read_u16()?,
        })
    }
}

/// Reply to a valid out-of-band connect. Carries everything the client
/// needs to start sending hashed, ordered datagrams.
#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionAccepted {
    pub use_debug_stream: bool,
    pub connection_id: u8,
    pub connection_secret: ConnectionSecret,
}

impl Display for ConnectionAccepted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connection accepted id:{} {}",
            self.connection_id, self.connection_secret
        )
    }
}

impl ConnectionAccepted {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(u8::from(self.use_debug_stream))?;
        stream.write_u8(self.connection_id)?;
        self.connection_secret.to_stream(stream)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            use_debug_stream: stream.read_u8()? != 0,
            connection_id: stream.read_u8()?,
            connection_secret: ConnectionSecret::from_stream(stream)?,
        })
    }
}

#[derive(Debug)]
pub enum HostToClientCommands<StepT: Deserialize + Serialize + Debug + Clone + Display> {
    JoinGame(JoinGameAccepted),
    JoinGameOutOfSlots(JoinGameRefused),
    GameStep(GameStepResponse<StepT>),
    DownloadGameState(DownloadGameStateResponse),
    BlobStreamChannel(SenderToReceiverFrontCommands),
    ConnectType(ConnectionAccepted),
    Pong(u16),
}

impl<StepT: Clone + Debug + Serialize + Deserialize + Display> Serialize
    for HostToClientCommands<StepT>
{
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.to_octet())?;
        match self {
            Self::JoinGame(join_game_response) => join_game_response.to_stream(stream),
            Self::JoinGameOutOfSlots(refused) => refused.to_stream(stream),
            Self::GameStep(game_step_response) => game_step_response.to_stream(stream),
            Self::DownloadGameState(download_response) => download_response.to_stream(stream),
            Self::BlobStreamChannel(blob_stream_command) => blob_stream_command.to_stream(stream),
            Self::ConnectType(connect_response) => connect_response.to_stream(stream),
            Self::Pong(client_time) => stream.write_u16(*client_time),
        }
    }
}

impl<StepT: Clone + Debug + Serialize + Deserialize + Display> Deserialize
    for HostToClientCommands<StepT>
{
    fn deserialize(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let command_value = stream.read_u8()?;
        let command = HostToClientCommand::try_from(command_value)?;
        let x = match command {
            HostToClientCommand::JoinGame => Self::JoinGame(JoinGameAccepted::from_stream(stream)?),
            HostToClientCommand::JoinGameOutOfSlots => {
                Self::JoinGameOutOfSlots(JoinGameRefused::from_stream(stream)?)
            }
            HostToClientCommand::GameStep => Self::GameStep(GameStepResponse::from_stream(stream)?),
            HostToClientCommand::DownloadGameState => {
                Self::DownloadGameState(DownloadGameStateResponse::from_stream(stream)?)
            }
            HostToClientCommand::BlobStreamChannel => {
                Self::BlobStreamChannel(SenderToReceiverFrontCommands::from_stream(stream)?)
            }
            HostToClientCommand::Connect => {
                Self::ConnectType(ConnectionAccepted::from_stream(stream)?)
            }
            HostToClientCommand::Pong => Self::Pong(stream.read_u16()?),
        };
        Ok(x)
    }
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> HostToClientCommands<StepT> {
    #[must_use]
    pub const fn to_octet(&self) -> u8 {
        match self {
            Self::JoinGame(_) => HostToClientCommand::JoinGame as u8,
            Self::JoinGameOutOfSlots(_) => HostToClientCommand::JoinGameOutOfSlots as u8,
            Self::GameStep(_) => HostToClientCommand::GameStep as u8,
            Self::DownloadGameState(_) => HostToClientCommand::DownloadGameState as u8,
            Self::BlobStreamChannel(_) => HostToClientCommand::BlobStreamChannel as u8,
            Self::ConnectType(_) => HostToClientCommand::Connect as u8,
            Self::Pong(_) => HostToClientCommand::Pong as u8,
        }
    }
}

impl<StepT: Clone + Debug + Serialize + Deserialize + Display> Display
    for HostToClientCommands<StepT>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JoinGame(join) => write!(f, "JoinGameResponse({join})"),
            Self::JoinGameOutOfSlots(refused) => write!(f, "JoinGameOutOfSlots({refused:?})"),
            Self::GameStep(game_step) => write!(f, "GameStepResponse({game_step})"),
            Self::DownloadGameState(download) => write!(f, "DownloadGameState({download})"),
            Self::BlobStreamChannel(blob) => write!(f, "BlobStreamChannel({blob})"),
            Self::ConnectType(connect) => write!(f, "ConnectResponse({connect})"),
            Self::Pong(_) => write!(f, "Pong"),
        }
    }
}

/// The party id together with the secret a client needs to reclaim it.
#[derive(Debug, PartialEq, Eq)]
pub struct PartyAndSecret {
    pub party_id: PartyId,
    pub secret: PartySecret,
}

impl PartyAndSecret {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        self.party_id.serialize(stream)?;
        self.secret.to_stream(stream)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            party_id: PartyId::deserialize(stream)?,
            secret: PartySecret::from_stream(stream)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct JoinGameParticipant {
    pub local_index: u8,
    pub participant_id: ParticipantId,
}

impl JoinGameParticipant {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.local_index)?;
        self.participant_id.serialize(stream)?;
        Ok(())
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            local_index: stream.read_u8()?,
            participant_id: ParticipantId::deserialize(stream)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct JoinGameParticipants(pub Vec<JoinGameParticipant>);

impl JoinGameParticipants {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.0.len() as u8)?;
        for join_game_participant in &self.0 {
            join_game_participant.to_stream(stream)?;
        }
        Ok(())
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let count = stream.read_u8()?;
        let mut vec = Vec::<JoinGameParticipant>::with_capacity(count as usize);
        for _ in 0..count {
            vec.push(JoinGameParticipant::from_stream(stream)?);
        }
        Ok(Self(vec))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct JoinGameAccepted {
    pub client_request_id: ClientRequestId,
    pub party_and_secret: PartyAndSecret,
    pub participants: JoinGameParticipants,
}

impl Display for JoinGameAccepted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "JoinGameAccepted {} {:?} {:?}",
            self.client_request_id, self.party_and_secret, self.participants
        )
    }
}

impl JoinGameAccepted {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        self.client_request_id.serialize(stream)?;
        self.party_and_secret.to_stream(stream)?;
        self.participants.to_stream(stream)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            client_request_id: ClientRequestId::deserialize(stream)?,
            party_and_secret: PartyAndSecret::from_stream(stream)?,
            participants: JoinGameParticipants::from_stream(stream)?,
        })
    }
}

/// Join failed because the participant pool is exhausted.
#[derive(Debug, PartialEq, Eq)]
pub struct JoinGameRefused {
    pub client_request_id: ClientRequestId,
}

impl JoinGameRefused {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        self.client_request_id.serialize(stream)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            client_request_id: ClientRequestId::deserialize(stream)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct GameStepResponseHeader {
    /// Highest predicted step the host has accepted from this client.
    pub last_received_step_id: TickId,
    /// How many predicted steps the host is currently buffering.
    pub step_buffer_count: u8,
    /// Client stream tip relative to the authoritative tip.
    pub authoritative_buffer_delta: i8,
}

impl Display for GameStepResponseHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "game_step_response last-received:{} buffered:{} delta:{}",
            self.last_received_step_id, self.step_buffer_count, self.authoritative_buffer_delta
        )
    }
}

impl GameStepResponseHeader {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        TickIdUtil::to_stream(self.last_received_step_id, stream)?;
        stream.write_u8(self.step_buffer_count)?;
        stream.write_i8(self.authoritative_buffer_delta)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            last_received_step_id: TickIdUtil::from_stream(stream)?,
            step_buffer_count: stream.read_u8()?,
            authoritative_buffer_delta: stream.read_i8()?,
        })
    }
}

#[derive(Debug)]
pub struct AuthoritativeStepRanges<StepT: Deserialize + Serialize + Debug + Clone + Display> {
    pub ranges: Vec<CombinedSteps<StepT>>,
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> Display
    for AuthoritativeStepRanges<StepT>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "auth_steps range-count:{} ranges:", self.ranges.len())?;
        for range in &self.ranges {
            write!(f, "\n{range}")?;
        }
        Ok(())
    }
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> Serialize
    for AuthoritativeStepRanges<StepT>
{
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        let root_tick_id = if self.ranges.is_empty() {
            TickId(0)
        } else {
            self.ranges[0].tick_id
        };

        let mut converted_ranges = Vec::new();
        let mut tick_id = root_tick_id;
        for range in &self.ranges {
            if range.tick_id < tick_id {
                Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "ranges must be sorted and non-overlapping",
                ))?;
            }
            let delta_ticks_from_previous = (range.tick_id - tick_id) as u8;
            tick_id = range.tick_id + range.steps.len() as u32;

            converted_ranges.push(AuthoritativeStepRange {
                delta_tick_id_from_previous: delta_ticks_from_previous,
                authoritative_steps: range.to_internal(),
            });
        }

        TickIdUtil::to_stream(root_tick_id, stream)?;
        stream.write_u8(converted_ranges.len() as u8)?;
        trace!(
            "serializing {} authoritative ranges from {}",
            converted_ranges.len(),
            root_tick_id
        );
        for range in &converted_ranges {
            range.to_stream(stream)?;
        }
        Ok(())
    }
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> Deserialize
    for AuthoritativeStepRanges<StepT>
{
    fn deserialize(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let root_tick_id = TickIdUtil::from_stream(stream)?;
        let range_count = stream.read_u8()?;

        let mut tick_id = root_tick_id;
        let mut converted_ranges = Vec::with_capacity(range_count as usize);
        for _ in 0..range_count {
            let internal = AuthoritativeStepRange::<StepT>::from_stream(stream)?;
            tick_id += u32::from(internal.delta_tick_id_from_previous);

            let combined = CombinedSteps::from_internal(&internal.authoritative_steps, tick_id);
            tick_id += combined.steps.len() as u32;
            converted_ranges.push(combined);
        }

        Ok(Self {
            ranges: converted_ranges,
        })
    }
}

#[derive(Debug)]
pub struct GameStepResponse<StepT: Serialize + Deserialize + Debug + Clone + Display> {
    pub response_header: GameStepResponseHeader,
    pub authoritative_steps: AuthoritativeStepRanges<StepT>,
}

impl<StepT: Serialize + Deserialize + Debug + Clone + Display> Display for GameStepResponse<StepT> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "response: {} auth-steps: {}",
            self.response_header, self.authoritative_steps
        )
    }
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> GameStepResponse<StepT> {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        self.response_header.to_stream(stream)?;
        self.authoritative_steps.serialize(stream)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        Ok(Self {
            response_header: GameStepResponseHeader::from_stream(stream)?,
            authoritative_steps: AuthoritativeStepRanges::deserialize(stream)?,
        })
    }
}
