/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use cadence_participant::ParticipantId;
use seq_map::SeqMap;

/// One tick's worth of steps, keyed by participant in insertion order.
pub type StepMap<StepT> = SeqMap<ParticipantId, StepT>;
