//! Inference engine abstraction.
//!
//! Defines the [`InferenceEngine`] trait that ML runtimes (TensorFlow Lite,
//! ONNX Runtime, Burn, candle, ...) implement. All data crosses the boundary
//! as flat `f32` buffers; shapes are declared by the engine, not carried by
//! the data.
//!
//! # Lifecycle
//!
//! 1. Create via an [`EngineFactory`] (one engine per loaded model)
//! 2. [`initialize`](InferenceEngine::initialize) from the model file
//! 3. [`set_input`](InferenceEngine::set_input) / [`run`](InferenceEngine::run) /
//!    [`output`](InferenceEngine::output), any number of times
//! 4. [`unload`](InferenceEngine::unload) to release weights

use crate::error::EngineError;
use crate::metadata::ModelMetadata;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Addresses an engine tensor by name or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorSlot<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for TensorSlot<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for TensorSlot<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for TensorSlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "'{}'", name),
            Self::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// A loaded model graph.
///
/// Engines are driven from one thread at a time (callers wrap them in a
/// lock), so only `Send` is required.
pub trait InferenceEngine: Send {
    /// Load weights from `path`.
    fn initialize(&mut self, path: &Path) -> Result<(), EngineError>;

    fn is_initialized(&self) -> bool;

    fn set_input(&mut self, slot: TensorSlot<'_>, data: &[f32]) -> Result<(), EngineError>;

    /// Run the graph on the inputs set so far.
    fn run(&mut self) -> Result<(), EngineError>;

    fn output(&self, slot: TensorSlot<'_>) -> Result<Vec<f32>, EngineError>;

    /// Declared input dimensions, if the engine knows them.
    fn input_shape(&self, slot: TensorSlot<'_>) -> Option<Vec<usize>>;

    /// Declared output dimensions, if the engine knows them.
    fn output_shape(&self, slot: TensorSlot<'_>) -> Option<Vec<usize>>;

    /// Bytes held by the loaded model (engine-reported).
    fn memory_usage(&self) -> u64;

    /// Request device acceleration. Returns whether it actually engaged.
    fn set_acceleration(&mut self, enabled: bool) -> Result<bool, EngineError>;

    /// Release weights. The engine reports uninitialized afterwards.
    fn unload(&mut self);
}

/// Creates one engine per model load. Called with the cataloged metadata.
pub type EngineFactory =
    Box<dyn Fn(&ModelMetadata) -> Result<Box<dyn InferenceEngine>, EngineError> + Send + Sync>;

/// Named tensors passed to and returned from a [`ClosureEngine`] graph.
pub type TensorMap = HashMap<String, Vec<f32>>;

/// Forward function of a [`ClosureEngine`].
pub type GraphFn = Box<dyn Fn(&TensorMap) -> Result<TensorMap, String> + Send>;

/// Pure-Rust engine whose graph is a closure.
///
/// Useful for hand-written models, tests, and runtimes wrapped outside this
/// crate. Index slots resolve to declared tensors in declaration order.
pub struct ClosureEngine {
    forward: GraphFn,
    inputs: Vec<(String, Vec<usize>)>,
    outputs: Vec<(String, Vec<usize>)>,
    staged: TensorMap,
    results: TensorMap,
    memory_bytes: u64,
    supports_acceleration: bool,
    require_model_file: bool,
    initialized: bool,
}

impl ClosureEngine {
    pub fn new(forward: impl Fn(&TensorMap) -> Result<TensorMap, String> + Send + 'static) -> Self {
        Self {
            forward: Box::new(forward),
            inputs: Vec::new(),
            outputs: Vec::new(),
            staged: TensorMap::new(),
            results: TensorMap::new(),
            memory_bytes: 0,
            supports_acceleration: false,
            require_model_file: false,
            initialized: false,
        }
    }

    /// Declare an input tensor. Writes to it are checked against `shape`.
    pub fn with_input(mut self, name: impl Into<String>, shape: &[usize]) -> Self {
        self.inputs.push((name.into(), shape.to_vec()));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, shape: &[usize]) -> Self {
        self.outputs.push((name.into(), shape.to_vec()));
        self
    }

    pub fn with_memory_usage(mut self, bytes: u64) -> Self {
        self.memory_bytes = bytes;
        self
    }

    pub fn with_acceleration_support(mut self, supported: bool) -> Self {
        self.supports_acceleration = supported;
        self
    }

    /// Fail [`initialize`](InferenceEngine::initialize) when the model file
    /// is missing.
    pub fn require_model_file(mut self) -> Self {
        self.require_model_file = true;
        self
    }

    fn resolve<'a>(
        declared: &'a [(String, Vec<usize>)],
        slot: TensorSlot<'a>,
    ) -> Option<(&'a str, Option<&'a [usize]>)> {
        match slot {
            TensorSlot::Name(name) => Some((
                name,
                declared
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, s)| s.as_slice()),
            )),
            TensorSlot::Index(index) => declared
                .get(index)
                .map(|(n, s)| (n.as_str(), Some(s.as_slice()))),
        }
    }
}

impl InferenceEngine for ClosureEngine {
    fn initialize(&mut self, path: &Path) -> Result<(), EngineError> {
        if self.require_model_file && !path.is_file() {
            tracing::warn!("Model file not found: {}", path.display());
            return Err(EngineError::Load {
                path: path.to_path_buf(),
                reason: "model file not found".to_string(),
            });
        }
        self.initialized = true;
        tracing::debug!("Closure engine initialized for {}", path.display());
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_input(&mut self, slot: TensorSlot<'_>, data: &[f32]) -> Result<(), EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let (name, shape) = Self::resolve(&self.inputs, slot)
            .ok_or_else(|| EngineError::UnknownTensor(slot.to_string()))?;
        if let Some(shape) = shape {
            let expected: usize = shape.iter().product();
            if expected != data.len() {
                return Err(EngineError::ShapeMismatch {
                    slot: name.to_string(),
                    expected,
                    actual: data.len(),
                });
            }
        }
        self.staged.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn run(&mut self) -> Result<(), EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        self.results = (self.forward)(&self.staged).map_err(|reason| {
            tracing::warn!("Closure engine run failed: {}", reason);
            EngineError::Run(reason)
        })?;
        Ok(())
    }

    fn output(&self, slot: TensorSlot<'_>) -> Result<Vec<f32>, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let (name, _) = Self::resolve(&self.outputs, slot)
            .ok_or_else(|| EngineError::UnknownTensor(slot.to_string()))?;
        self.results
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownTensor(name.to_string()))
    }

    fn input_shape(&self, slot: TensorSlot<'_>) -> Option<Vec<usize>> {
        Self::resolve(&self.inputs, slot).and_then(|(_, s)| s.map(<[usize]>::to_vec))
    }

    fn output_shape(&self, slot: TensorSlot<'_>) -> Option<Vec<usize>> {
        Self::resolve(&self.outputs, slot).and_then(|(_, s)| s.map(<[usize]>::to_vec))
    }

    fn memory_usage(&self) -> u64 {
        if self.initialized {
            self.memory_bytes
        } else {
            0
        }
    }

    fn set_acceleration(&mut self, enabled: bool) -> Result<bool, EngineError> {
        Ok(enabled && self.supports_acceleration)
    }

    fn unload(&mut self) {
        self.staged.clear();
        self.results.clear();
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubler() -> ClosureEngine {
        ClosureEngine::new(|inputs| {
            let x = inputs.get("x").ok_or("missing x")?;
            let mut out = TensorMap::new();
            out.insert("y".to_string(), x.iter().map(|v| v * 2.0).collect());
            Ok(out)
        })
        .with_input("x", &[1, 3])
        .with_output("y", &[1, 3])
        .with_memory_usage(1024)
    }

    #[test]
    fn test_closure_engine_lifecycle() {
        let mut engine = doubler();
        assert!(!engine.is_initialized());
        assert_eq!(engine.memory_usage(), 0);
        assert!(matches!(
            engine.set_input("x".into(), &[1.0, 2.0, 3.0]),
            Err(EngineError::NotInitialized)
        ));

        engine.initialize(Path::new("unused")).unwrap();
        assert!(engine.is_initialized());
        assert_eq!(engine.memory_usage(), 1024);

        engine.set_input(TensorSlot::Index(0), &[1.0, 2.0, 3.0]).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.output("y".into()).unwrap(), vec![2.0, 4.0, 6.0]);
        assert_eq!(engine.output(0.into()).unwrap(), vec![2.0, 4.0, 6.0]);

        engine.unload();
        assert!(!engine.is_initialized());
        assert!(engine.run().is_err());
    }

    #[test]
    fn test_shape_checked_on_input() {
        let mut engine = doubler();
        engine.initialize(Path::new("unused")).unwrap();
        let err = engine.set_input("x".into(), &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ShapeMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
        assert!(matches!(
            engine.set_input(TensorSlot::Index(4), &[1.0]),
            Err(EngineError::UnknownTensor(_))
        ));
    }

    #[test]
    fn test_shapes_and_acceleration() {
        let mut engine = doubler();
        assert_eq!(engine.input_shape("x".into()), Some(vec![1, 3]));
        assert_eq!(engine.output_shape(0.into()), Some(vec![1, 3]));
        assert_eq!(engine.input_shape("nope".into()), None);
        assert!(!engine.set_acceleration(true).unwrap());

        let mut fast = doubler().with_acceleration_support(true);
        assert!(fast.set_acceleration(true).unwrap());
        assert!(!fast.set_acceleration(false).unwrap());
    }

    #[test]
    fn test_require_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.tflite");

        let mut engine = doubler().require_model_file();
        assert!(matches!(
            engine.initialize(&path),
            Err(EngineError::Load { .. })
        ));
        assert!(!engine.is_initialized());

        std::fs::write(&path, b"weights").unwrap();
        engine.initialize(&path).unwrap();
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_forward_error_maps_to_run() {
        let mut engine = ClosureEngine::new(|_| Err("boom".to_string()));
        engine.initialize(Path::new("unused")).unwrap();
        assert!(matches!(engine.run(), Err(EngineError::Run(msg)) if msg == "boom"));
    }
}
