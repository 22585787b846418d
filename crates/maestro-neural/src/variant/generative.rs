//! Latent-variable sequence model: encode, decode, sample, interpolate.

use super::{clamp_temperature, ModelCore};
use crate::error::InferError;
use maestro_core::{InferenceEngine, ModelMetadata};
use maestro_midi::{sequence_to_tensor, tensor_to_sequence, Sequence};
use rand::Rng;
use rand_distr::StandardNormal;

/// Point in a model's latent space.
pub type LatentVector = Vec<f32>;

/// Latent size used when the engine does not declare one.
pub const DEFAULT_LATENT_DIM: usize = 256;

const ENCODER_INPUT: &str = "encoder_input";
const LATENT: &str = "z";
const TEMPERATURE: &str = "temperature";
const DECODER_OUTPUT: &str = "decoder_output";

/// Linear interpolation from `z1` to `z2` in `steps` points.
///
/// The first and last points are exact copies of `z1` and `z2`. Fewer than
/// two steps yields just the endpoints that fit (`0` -> none, `1` -> `z1`).
pub fn interpolate_latents(
    z1: &[f32],
    z2: &[f32],
    steps: usize,
) -> Result<Vec<LatentVector>, InferError> {
    if z1.len() != z2.len() {
        return Err(InferError::DimensionMismatch {
            expected: z1.len(),
            actual: z2.len(),
        });
    }
    if steps < 2 {
        return Ok(if steps == 1 { vec![z1.to_vec()] } else { Vec::new() });
    }

    let last = steps - 1;
    Ok((0..steps)
        .map(|i| {
            if i == 0 {
                z1.to_vec()
            } else if i == last {
                z2.to_vec()
            } else {
                let t = i as f32 / last as f32;
                z1.iter()
                    .zip(z2)
                    .map(|(a, b)| (1.0 - t) * a + t * b)
                    .collect()
            }
        })
        .collect())
}

pub struct GenerativeModel {
    pub(super) core: ModelCore,
    latent_dim: usize,
    ticks_per_quarter: u32,
}

impl GenerativeModel {
    pub(super) fn from_core(core: ModelCore, ticks_per_quarter: u32) -> Self {
        let latent_dim = core
            .peek(|engine| engine.output_shape(LATENT.into()))
            .and_then(|shape| shape.last().copied())
            .filter(|&dim| dim > 0)
            .unwrap_or(DEFAULT_LATENT_DIM);

        Self {
            core,
            latent_dim,
            ticks_per_quarter,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.core.metadata()
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
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

    /// Encode a sequence into a latent vector.
    pub fn encode(&self, sequence: &Sequence) -> Result<LatentVector, InferError> {
        let tensor = sequence_to_tensor(sequence);

        self.core.with_engine(|engine| {
            if let Some(shape) = engine.input_shape(ENCODER_INPUT.into()) {
                let expected: usize = shape.iter().product();
                if expected != tensor.len() {
                    return Err(InferError::ShapeMismatch {
                        expected,
                        actual: tensor.len(),
                    });
                }
            }

            engine.set_input(ENCODER_INPUT.into(), &tensor)?;
            engine.run()?;
            Ok(engine.output(LATENT.into())?)
        })
    }

    /// Decode a latent vector. `temperature` is clamped to the model range.
    pub fn decode(&self, z: &[f32], temperature: f32) -> Result<Sequence, InferError> {
        if z.len() != self.latent_dim {
            return Err(InferError::DimensionMismatch {
                expected: self.latent_dim,
                actual: z.len(),
            });
        }

        let output = self.core.with_engine(|engine| {
            run_decoder(engine, z, clamp_temperature(temperature))
        })?;
        Ok(tensor_to_sequence(&output, self.ticks_per_quarter))
    }

    /// Draw a latent vector from the prior, N(0, 1) scaled by `temperature`.
    ///
    /// The scale is not clamped to the decoder range. A non-finite or
    /// non-positive temperature samples at 1.0.
    pub fn sample_prior(&self, temperature: f32) -> LatentVector {
        self.sample_prior_with(&mut rand::thread_rng(), temperature)
    }

    pub fn sample_prior_with<R: Rng>(&self, rng: &mut R, temperature: f32) -> LatentVector {
        let temperature = if temperature.is_finite() && temperature > 0.0 {
            temperature
        } else {
            1.0
        };
        (0..self.latent_dim)
            .map(|_| rng.sample::<f32, _>(StandardNormal) * temperature)
            .collect()
    }

    /// Decode a fresh prior sample.
    pub fn sample(&self, temperature: f32) -> Result<Sequence, InferError> {
        let z = self.sample_prior(temperature);
        self.decode(&z, temperature)
    }

    pub fn interpolate(
        &self,
        z1: &[f32],
        z2: &[f32],
        steps: usize,
    ) -> Result<Vec<LatentVector>, InferError> {
        interpolate_latents(z1, z2, steps)
    }

    /// Morph between two sequences through latent space.
    pub fn interpolate_sequences(
        &self,
        from: &Sequence,
        to: &Sequence,
        steps: usize,
        temperature: f32,
    ) -> Result<Vec<Sequence>, InferError> {
        let z1 = self.encode(from)?;
        let z2 = self.encode(to)?;

        interpolate_latents(&z1, &z2, steps)?
            .iter()
            .map(|z| self.decode(z, temperature))
            .collect()
    }
}

fn run_decoder(
    engine: &mut dyn InferenceEngine,
    z: &[f32],
    temperature: f32,
) -> Result<Vec<f32>, InferError> {
    engine.set_input(LATENT.into(), z)?;
    engine.set_input(TEMPERATURE.into(), &[temperature])?;
    engine.run()?;
    Ok(engine.output(DECODER_OUTPUT.into())?)
}
