/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::ChunkIndex;
use err_rs::{ErrorLevel, ErrorLevelProvider};
use std::io;

#[derive(Debug)]
pub enum BlobError {
    InvalidChunkIndex(ChunkIndex, ChunkIndex),
    UnexpectedChunkSize(usize, usize, ChunkIndex),
    OutOfBounds,
    RedundantContentDiffers(ChunkIndex),
    RedundantSameContents(ChunkIndex),
    IoError(io::Error),
}

impl ErrorLevelProvider for BlobError {
    fn error_level(&self) -> ErrorLevel {
        match self {
            Self::RedundantSameContents(_) => ErrorLevel::Info,
            Self::InvalidChunkIndex(..)
            | Self::UnexpectedChunkSize(..)
            | Self::OutOfBounds
            | Self::RedundantContentDiffers(_)
            | Self::IoError(_) => ErrorLevel::Warning,
        }
    }
}

impl From<io::Error> for BlobError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}
