/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
pub use crate::{
    err::BlobError,
    in_logic_front::{FrontLogic, FrontLogicError},
    out_logic_front::OutLogicFront,
    out_stream::OutStreamError,
    protocol::{AckChunkData, SetChunkData, StartTransferData, TransferId},
    protocol_front::{
        AckChunkFrontData, ReceiverToSenderFrontCommands, SenderToReceiverFrontCommands,
        SetChunkFrontData,
    },
    ChunkIndex,
};
