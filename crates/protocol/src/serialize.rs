/*
 * Copyright (c) Cadence contributors. All rights reserved. https://github.com/cadence-rs/cadence
 * Licensed under the MIT License. See LICENSE in the project root for license information.
 */
use crate::host_to_client::TickIdUtil;
use cadence_participant::ParticipantId;
use cadence_step_map::StepMap;
use flood_rs::{Deserialize, ReadOctetStream, Serialize, WriteOctetStream};
use seq_map::SeqMap;
use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::io;
use tick_id::TickId;

/// A contiguous run of ticks, each carrying one step per contributing
/// participant.
///
/// On the wire the run is transposed into one step vector per participant
/// (id, delta from the range start, count, steps) so a joiner that starts
/// contributing mid-range costs no placeholder bytes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CombinedSteps<StepT: Deserialize + Serialize + Debug + Clone + Display> {
    pub tick_id: TickId,
    pub steps: Vec<StepMap<StepT>>,
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> Display for CombinedSteps<StepT> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: step_count:{}", self.tick_id, self.steps.len())
    }
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> Serialize for CombinedSteps<StepT> {
    fn serialize(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        TickIdUtil::to_stream(self.tick_id, stream)?;
        self.to_internal().serialize(stream)
    }
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> Deserialize
    for CombinedSteps<StepT>
{
    fn deserialize(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let start_tick_id = TickIdUtil::from_stream(stream)?;
        let internal = ParticipantStepVectors::deserialize(stream)?;
        Ok(Self::from_internal(&internal, start_tick_id))
    }
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> CombinedSteps<StepT> {
    #[must_use]
    pub fn to_internal(&self) -> ParticipantStepVectors<StepT> {
        let mut vectors = SeqMap::<ParticipantId, StepVectorForOneParticipant<StepT>>::new();

        let mut unique_participant_ids: HashSet<ParticipantId> = HashSet::new();
        for tick_map in &self.steps {
            for key in tick_map.keys() {
                unique_participant_ids.insert(*key);
            }
        }

        let mut sorted_unique_ids: Vec<ParticipantId> =
            unique_participant_ids.into_iter().collect();
        sorted_unique_ids.sort();

        for participant_id in sorted_unique_ids {
            vectors
                .insert(
                    participant_id,
                    StepVectorForOneParticipant::<StepT> {
                        delta_tick_id: 0,
                        steps: vec![],
                    },
                )
                .expect("participant ids are unique");
        }

        for (index_in_range, tick_map) in self.steps.iter().enumerate() {
            for (participant_id, step) in tick_map {
                let vector = vectors
                    .get_mut(participant_id)
                    .expect("every id was inserted above");
                if vector.steps.is_empty() {
                    vector.delta_tick_id = index_in_range as u8;
                }
                vector.steps.push(step.clone());
            }
        }

        ParticipantStepVectors::<StepT> {
            step_vectors: vectors,
        }
    }

    #[must_use]
    pub fn from_internal(
        separate_vectors: &ParticipantStepVectors<StepT>,
        start_tick_id: TickId,
    ) -> Self {
        let mut max_vector_end = 0;
        for vector in separate_vectors.step_vectors.values() {
            let end = vector.delta_tick_id as usize + vector.steps.len();
            if end > max_vector_end {
                max_vector_end = end;
            }
        }

        let mut tick_maps = Vec::<StepMap<StepT>>::new();
        for _ in 0..max_vector_end {
            tick_maps.push(StepMap::new());
        }

        for (participant_id, vector) in &separate_vectors.step_vectors {
            for (index, step) in vector.steps.iter().enumerate() {
                let tick_map = tick_maps
                    .get_mut(vector.delta_tick_id as usize + index)
                    .expect("vector ends were measured above");
                tick_map
                    .insert(*participant_id, step.clone())
                    .expect("participant ids are unique per tick");
            }
        }

        Self {
            tick_id: start_tick_id,
            steps: tick_maps,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct StepVectorForOneParticipant<StepT: Serialize + Deserialize + Display> {
    /// Lets one vector start at a later tick than the rest of the range.
    pub delta_tick_id: u8,
    pub steps: Vec<StepT>,
}

impl<StepT: Serialize + Deserialize + Display> Display for StepVectorForOneParticipant<StepT> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "delta_tick {} step_count:{}",
            self.delta_tick_id,
            self.steps.len()
        )
    }
}

/// The transposed form of a [`CombinedSteps`] range.
#[derive(Debug, PartialEq, Clone)]
pub struct ParticipantStepVectors<StepT: Serialize + Deserialize + Display> {
    pub step_vectors: SeqMap<ParticipantId, StepVectorForOneParticipant<StepT>>,
}

impl<StepT: Serialize + Deserialize + Debug + Display> ParticipantStepVectors<StepT> {
    pub fn serialize(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.step_vectors.len() as u8)?;

        for (participant_id, vector) in &self.step_vectors {
            participant_id.serialize(stream)?;
            stream.write_u8(vector.delta_tick_id)?;
            stream.write_u8(vector.steps.len() as u8)?;
            for step in &vector.steps {
                step.serialize(stream)?;
            }
        }
        Ok(())
    }

    pub fn deserialize(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let participant_count = stream.read_u8()?;
        let mut step_vectors = SeqMap::new();
        for _ in 0..participant_count {
            let participant_id = ParticipantId::deserialize(stream)?;
            let delta_tick_id = stream.read_u8()?;
            let step_count = stream.read_u8()? as usize;

            let mut steps = Vec::with_capacity(step_count);
            for _ in 0..step_count {
                steps.push(StepT::deserialize(stream)?);
            }

            step_vectors
                .insert(
                    participant_id,
                    StepVectorForOneParticipant {
                        delta_tick_id,
                        steps,
                    },
                )
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{err:?}")))?;
        }

        Ok(Self { step_vectors })
    }
}

/// One range inside a game-step response, positioned relative to the
/// previous range.
#[derive(Debug)]
pub struct AuthoritativeStepRange<StepT: Deserialize + Serialize + Debug + Clone + Display> {
    pub delta_tick_id_from_previous: u8,
    pub authoritative_steps: ParticipantStepVectors<StepT>,
}

impl<StepT: Deserialize + Serialize + Debug + Clone + Display> AuthoritativeStepRange<StepT> {
    pub fn to_stream(&self, stream: &mut impl WriteOctetStream) -> io::Result<()> {
        stream.write_u8(self.delta_tick_id_from_previous)?;
        self.authoritative_steps.serialize(stream)
    }

    pub fn from_stream(stream: &mut impl ReadOctetStream) -> io::Result<Self> {
        let delta_tick_id_from_previous = stream.read_u8()?;
        let authoritative_steps = ParticipantStepVectors::deserialize(stream)?;
        Ok(Self {
            delta_tick_id_from_previous,
            authoritative_steps,
        })
    }
}
