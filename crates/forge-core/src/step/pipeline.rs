//! Proveedor de pipeline: el único punto de extensión del core.
//!
//! Un pipeline es simplemente una secuencia ordenada de `BuildStep`s; quien
//! la provee decide el contenido. El core sólo itera la secuencia.

use std::sync::Arc;

use super::BuildStep;

pub trait PipelineProvider: Send + Sync {
    /// Secuencia ordenada de steps que conforma el pipeline.
    fn get_build_steps(&self) -> Vec<Arc<dyn BuildStep>>;
}

/// Proveedor trivial sobre una lista fija (útil en tests y demos).
pub struct FixedPipeline {
    steps: Vec<Arc<dyn BuildStep>>,
}

impl FixedPipeline {
    pub fn new(steps: Vec<Arc<dyn BuildStep>>) -> Self {
        Self { steps }
    }
}

impl PipelineProvider for FixedPipeline {
    fn get_build_steps(&self) -> Vec<Arc<dyn BuildStep>> {
        self.steps.clone()
    }
}
