//! Definiciones relacionadas a steps.
//!
//! Un step es la unidad polimórfica de trabajo del pipeline: declara sus
//! dependencias, su forma de fan-out y su comportamiento opcional de
//! finalize. Este módulo define:
//! - `BuildStep`: contrato consumido por el engine.
//! - `FanOut`: unión cerrada de formas de fan-out.
//! - `StepRunResult` / `JobResult`: resultado por job.
//! - `PipelineProvider`: secuencia ordenada de steps.

mod definition;
mod pipeline;
mod run_result;

pub use definition::{BuildStep, FanOut};
pub use pipeline::{FixedPipeline, PipelineProvider};
pub use run_result::{JobResult, StepRunResult};
