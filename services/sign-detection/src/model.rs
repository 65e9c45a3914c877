//! Inference runtime boundary. The prediction engine only sees [`Classifier`];
//! the tract ONNX plan is one implementation of it.

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::preprocess::{InputTensor, INPUT_SHAPE};

/// Accepts a `(1, 3, 224, 224)` tensor and returns one raw score per class.
///
/// Implementations are inference-only once constructed: no learned parameter
/// may change between calls. `forward` may be called from several threads at
/// once; wrap a runtime that is not reentrant in [`Serialized`].
pub trait Classifier: Send + Sync {
    fn forward(&self, input: InputTensor) -> Result<Vec<f32>>;

    /// Number of scores the model emits, when known up front.
    fn output_classes(&self) -> Option<usize> { None }
}

/// ONNX graph optimized into a runnable tract plan. `SimplePlan::run` builds
/// fresh per-call state, so concurrent forward passes are safe.
pub struct OnnxClassifier {
    path: PathBuf,
    plan: TypedRunnableModel<TypedModel>,
    classes: usize,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier").field("path", &self.path).field("classes", &self.classes).finish()
    }
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        let start = Instant::now();
        let (n, c, h, w) = INPUT_SHAPE;
        let plan = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(n, c, h, w)))?
            .into_optimized()?
            .into_runnable()?;
        let mut this = Self { path: path.to_path_buf(), plan, classes: 0 };
        this.classes = this.warmup()?;
        info!(path=%path.display(), classes=this.classes, elapsed_ms=start.elapsed().as_millis() as u64, "onnx model loaded");
        Ok(this)
    }

    // Zero-input forward pass: proves the graph runs and reveals the output width.
    fn warmup(&self) -> Result<usize> {
        let scores = self.forward(InputTensor::zeros(INPUT_SHAPE))?;
        if scores.is_empty() { return Err(anyhow!("model {} produced an empty output", self.path.display())); }
        Ok(scores.len())
    }
}

impl Classifier for OnnxClassifier {
    fn forward(&self, input: InputTensor) -> Result<Vec<f32>> {
        let outputs = self.plan.run(tvec!(input.into_tensor().into()))?;
        let scores = outputs.first().ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores: Vec<f32> = scores.to_array_view::<f32>()?.iter().copied().collect();
        debug!(scores = scores.len(), "forward pass complete");
        Ok(scores)
    }

    fn output_classes(&self) -> Option<usize> { Some(self.classes) }
}

/// Allows at most one forward pass at a time through the wrapped model.
pub struct Serialized<C> {
    inner: C,
    gate: Mutex<()>,
}

impl<C: Classifier> Serialized<C> {
    pub fn new(inner: C) -> Self { Self { inner, gate: Mutex::new(()) } }
}

impl<C: Classifier> Classifier for Serialized<C> {
    fn forward(&self, input: InputTensor) -> Result<Vec<f32>> {
        let _guard = self.gate.lock();
        self.inner.forward(input)
    }

    fn output_classes(&self) -> Option<usize> { self.inner.output_classes() }
}
