use indexmap::IndexMap;

use crate::errors::BuildError;
use crate::model::CtxValue;

/// Mapping producido por la ejecución de un job, con las claves de resultado
/// que el step define.
pub type JobResult = IndexMap<String, CtxValue>;

/// Resultado abstracto de ejecutar (o finalizar) un step.
#[derive(Debug)]
pub enum StepRunResult {
    Success { output: JobResult },
    Failure { error: BuildError },
}

impl StepRunResult {
    /// Éxito sin output (útil para finalize por defecto y steps tipo sink).
    pub fn empty() -> Self {
        StepRunResult::Success { output: JobResult::new() }
    }

    pub fn success<I>(entries: I) -> Self
        where I: IntoIterator<Item = (String, CtxValue)>
    {
        StepRunResult::Success { output: entries.into_iter().collect() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepRunResult::Success { .. })
    }
}
