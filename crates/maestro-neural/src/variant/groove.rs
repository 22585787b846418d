//! Groove extraction and transfer.

use super::{clamp_temperature, clamp_unit, ModelCore};
use crate::error::InferError;
use maestro_core::{InferenceEngine, ModelMetadata};
use maestro_midi::{
    apply_swing, sequence_to_tensor, tensor_to_sequence_scaled, GrooveVector, Sequence,
};
use parking_lot::Mutex;

pub const DEFAULT_GROOVE_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_HUMANIZE: f32 = 0.5;

const INPUT_SEQUENCE: &str = "input_sequence";
const TEMPERATURE: &str = "temperature";
const HUMANIZE: &str = "humanize";
const GROOVE_EMBEDDING: &str = "groove_embedding";
const OUTPUT_SEQUENCE: &str = "output_sequence";

#[derive(Debug, Clone, Copy)]
struct GrooveParams {
    temperature: f32,
    humanize: f32,
}

pub struct GrooveModel {
    pub(super) core: ModelCore,
    params: Mutex<GrooveParams>,
    ticks_per_quarter: u32,
}

impl GrooveModel {
    pub(super) fn from_core(core: ModelCore, ticks_per_quarter: u32) -> Self {
        Self {
            core,
            params: Mutex::new(GrooveParams {
                temperature: DEFAULT_GROOVE_TEMPERATURE,
                humanize: DEFAULT_HUMANIZE,
            }),
            ticks_per_quarter,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.core.metadata()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    pub fn memory_usage(&self) -> u64 {
        self.core.memory_usage()
    }

    pub fn unload(&self) {
        self.core.unload();
    }

    pub fn temperature(&self) -> f32 {
        self.params.lock().temperature
    }

    /// Temperature used by [`apply_groove_vector`](Self::apply_groove_vector).
    pub fn set_temperature(&self, temperature: f32) {
        self.params.lock().temperature = clamp_temperature(temperature);
    }

    pub fn humanize(&self) -> f32 {
        self.params.lock().humanize
    }

    pub fn set_humanize(&self, humanize: f32) {
        self.params.lock().humanize = clamp_unit(humanize);
    }

    /// Re-time `notes` through the model, then swing the off-beat eighths.
    ///
    /// Both temperature and humanize follow `groove_amount`.
    pub fn apply_groove(
        &self,
        notes: &Sequence,
        groove_amount: f32,
        swing_amount: f32,
    ) -> Result<Sequence, InferError> {
        let amount = clamp_unit(groove_amount);
        let grooved = self.transfer(notes, clamp_temperature(amount), amount, None)?;
        Ok(apply_swing(&grooved, swing_amount))
    }

    /// Embedding of how `sequence` deviates from a straight grid.
    pub fn extract_groove(&self, sequence: &Sequence) -> Result<GrooveVector, InferError> {
        let tensor = sequence_to_tensor(sequence);
        self.core.with_engine(|engine| {
            engine.set_input(INPUT_SEQUENCE.into(), &tensor)?;
            engine.run()?;
            Ok(engine.output(GROOVE_EMBEDDING.into())?)
        })
    }

    /// Apply a stored groove at partial strength.
    pub fn apply_groove_vector(
        &self,
        notes: &Sequence,
        groove: &[f32],
        amount: f32,
    ) -> Result<Sequence, InferError> {
        let amount = clamp_unit(amount);
        let scaled: Vec<f32> = groove.iter().map(|g| g * amount).collect();
        let temperature = self.temperature();
        self.transfer(notes, temperature, amount, Some(&scaled))
    }

    fn transfer(
        &self,
        notes: &Sequence,
        temperature: f32,
        humanize: f32,
        groove: Option<&[f32]>,
    ) -> Result<Sequence, InferError> {
        if notes.is_empty() {
            return Ok(notes.clone());
        }

        let tensor = sequence_to_tensor(notes);
        let output = self.core.with_engine(|engine| {
            run_transfer(engine, &tensor, temperature, humanize, groove)
        })?;

        let tpq = if notes.ticks_per_quarter > 0 {
            notes.ticks_per_quarter
        } else {
            self.ticks_per_quarter
        };
        Ok(tensor_to_sequence_scaled(&output, tpq, notes.total_ticks)
            .with_time_signature(notes.time_signature))
    }
}

fn run_transfer(
    engine: &mut dyn InferenceEngine,
    tensor: &[f32],
    temperature: f32,
    humanize: f32,
    groove: Option<&[f32]>,
) -> Result<Vec<f32>, InferError> {
    engine.set_input(INPUT_SEQUENCE.into(), tensor)?;
    if let Some(groove) = groove {
        engine.set_input(GROOVE_EMBEDDING.into(), groove)?;
    }
    engine.set_input(TEMPERATURE.into(), &[temperature])?;
    engine.set_input(HUMANIZE.into(), &[humanize])?;
    engine.run()?;
    Ok(engine.output(OUTPUT_SEQUENCE.into())?)
}
