use super::ModelCore;
use crate::error::InferError;
use maestro_core::{ModelMetadata, TensorSlot};

/// Raw tensor access for model kinds without a typed variant.
pub struct GenericModel {
    pub(super) core: ModelCore,
}

impl GenericModel {
    pub(super) fn from_core(core: ModelCore) -> Self {
        Self { core }
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

    pub fn input_shape<'a>(&self, slot: impl Into<TensorSlot<'a>>) -> Option<Vec<usize>> {
        let slot = slot.into();
        self.core.peek(|engine| engine.input_shape(slot))
    }

    pub fn output_shape<'a>(&self, slot: impl Into<TensorSlot<'a>>) -> Option<Vec<usize>> {
        let slot = slot.into();
        self.core.peek(|engine| engine.output_shape(slot))
    }

    /// Set every named input, run once, and read `output`.
    pub fn run<'a>(
        &self,
        inputs: &[(&str, &[f32])],
        output: impl Into<TensorSlot<'a>>,
    ) -> Result<Vec<f32>, InferError> {
        let output = output.into();
        self.core.with_engine(|engine| {
            for &(name, data) in inputs {
                engine.set_input(TensorSlot::Name(name), data)?;
            }
            engine.run()?;
            Ok(engine.output(output)?)
        })
    }
}
