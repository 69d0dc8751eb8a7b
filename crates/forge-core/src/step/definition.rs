use async_trait::async_trait;

use crate::model::BuildContext;
use super::run_result::StepRunResult;

/// Forma de fan-out de un step: cómo se expande un stage en jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// Exactamente un job con el slice completo de inputs requeridos.
    Single,
    /// Un job por registro de la secuencia de entidades del contexto.
    PerEntity,
    /// Un job por brush de cada entidad, según la tabla de brushes
    /// residente en el contexto.
    PerBrush,
}

/// Trait que define un step del pipeline de build.
///
/// Las implementaciones deben ser puras respecto del slice recibido: `run`
/// no puede mutar estado compartido; todo output fluye por el mapping
/// retornado y es el merger quien lo incorpora al contexto.
#[async_trait]
pub trait BuildStep: Send + Sync {
    /// Nombre estable y único dentro del pipeline.
    fn name(&self) -> &str;

    /// Forma de fan-out del step.
    fn fan_out(&self) -> FanOut;

    /// Claves de contexto requeridas para la ejecución.
    fn required_inputs(&self) -> Vec<String> {
        Vec::new()
    }

    /// Claves de contexto requeridas para la fase de finalize.
    fn finalize_inputs(&self) -> Vec<String> {
        Vec::new()
    }

    /// Si el step participa de la pasada secuencial de finalize.
    fn wants_finalize(&self) -> bool {
        false
    }

    /// Ejecuta un job sobre su slice privado del contexto.
    async fn run(&self, ctx: &BuildContext) -> StepRunResult;

    /// Fase de finalize (sólo se invoca si `wants_finalize()`).
    async fn finalize(&self, _ctx: &BuildContext) -> StepRunResult {
        StepRunResult::empty()
    }
}
