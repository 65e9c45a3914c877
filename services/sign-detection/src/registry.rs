//! Process-wide model and label registry, built once at startup and shared
//! read-only afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ModelsConfig;
use crate::labels::ModelKind;
use crate::model::{Classifier, OnnxClassifier, Serialized};

/// Preprocessing pickles older deployments shipped next to the models.
pub const LEGACY_PIPELINE_ARTIFACTS: [&str; 2] = ["preprocess_pipeline.pkl", "preprocessing.pkl"];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model artifact {} is corrupt: {reason:#}", .path.display())]
    Corrupt { path: PathBuf, reason: anyhow::Error },
    #[error("no model artifacts could be loaded from {}", .0.display())]
    NoModels(PathBuf),
}

#[derive(Clone, Default)]
pub struct Registry {
    models: BTreeMap<ModelKind, Arc<dyn Classifier>>,
    labels: BTreeMap<ModelKind, Arc<[String]>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("labels", &self.labels.iter().map(|(k, l)| (*k, l.len())).collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_model(mut self, kind: ModelKind, model: impl Classifier + 'static) -> Self {
        self.models.insert(kind, Arc::new(model));
        self
    }

    pub fn with_labels<I, S>(mut self, kind: ModelKind, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.insert(kind, labels.into_iter().map(Into::<String>::into).collect::<Arc<[String]>>());
        self
    }

    /// Registers a model together with its built-in label table.
    pub fn with_builtin(self, kind: ModelKind, model: impl Classifier + 'static) -> Self {
        self.with_model(kind, model).with_labels(kind, kind.labels().iter().copied())
    }

    pub fn model(&self, kind: ModelKind) -> Option<&Arc<dyn Classifier>> { self.models.get(&kind) }

    pub fn labels(&self, kind: ModelKind) -> Option<&[String]> { self.labels.get(&kind).map(|l| &l[..]) }

    pub fn label_sets(&self) -> impl Iterator<Item = (ModelKind, &[String])> {
        self.labels.iter().map(|(k, l)| (*k, &l[..]))
    }

    pub fn available_selectors(&self) -> Vec<String> {
        self.models.keys().map(|k| k.selector().to_string()).collect()
    }

    pub fn len(&self) -> usize { self.models.len() }
    pub fn is_empty(&self) -> bool { self.models.is_empty() }
}

/// Loads every known model from `cfg.dir`. A missing artifact is skipped with
/// a warning; one that exists but cannot be deserialized aborts startup.
pub fn load_registry(cfg: &ModelsConfig) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    for kind in ModelKind::ALL {
        let path = cfg.dir.join(kind.artifact());
        if !path.is_file() {
            warn!(model=%kind, path=%path.display(), "model artifact not found; {} detection disabled", kind.describe());
            continue;
        }
        let model = OnnxClassifier::load(&path).map_err(|reason| RegistryError::Corrupt { path: path.clone(), reason })?;
        let labels = kind.labels();
        if let Some(classes) = model.output_classes() {
            if classes != labels.len() {
                warn!(model=%kind, outputs=classes, labels=labels.len(), "model output width does not match label count");
            }
        }
        info!(model=%kind, classes=labels.len(), path=%path.display(), "model registered");
        registry = if cfg.serialize_inference {
            registry.with_builtin(kind, Serialized::new(model))
        } else {
            registry.with_builtin(kind, model)
        };
    }
    report_legacy_artifacts(cfg);
    if registry.is_empty() {
        if cfg.require_any { return Err(RegistryError::NoModels(cfg.dir.clone())); }
        warn!(dir=%cfg.dir.display(), "no models loaded; running degraded");
    }
    info!(models=?registry.available_selectors(), "registry ready");
    Ok(registry)
}

fn report_legacy_artifacts(cfg: &ModelsConfig) {
    if let Some(found) = LEGACY_PIPELINE_ARTIFACTS.iter().map(|f| cfg.dir.join(f)).find(|p| p.is_file()) {
        info!(path=%found.display(), "legacy preprocessing artifact present; ignored, preprocessing is built in");
    }
}
