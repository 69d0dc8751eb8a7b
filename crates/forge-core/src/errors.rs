//! Errores del motor de builds.
//!
//! Todos los errores fatales desembocan en el mismo camino de limpieza del
//! engine: shutdown del scheduler antes de reportar el fallo, y la fase de
//! finalize nunca corre después de un error fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum BuildError {
    /// Input requerido ausente del contexto. Fatal durante la fase de run;
    /// durante finalize sólo se loggea y el finalize de ese step se omite.
    #[error("missing dependency '{key}' required by step '{step}'")]
    MissingDependency { step: String, key: String },

    /// Un step declaró la clave reservada del scheduler como input.
    /// Se rechaza al expandir el stage, antes de que corra ningún job.
    #[error("step '{step}' declares reserved scheduler key '{key}' as a required input")]
    InvalidStepDeclaration { step: String, key: String },

    /// Dos stages produjeron la misma clave hoja del contexto.
    #[error("conflicting result for context key '{key}'")]
    ConflictingResult { key: String },

    /// Un resultado bajo la clave estructural no es fragmento ni artifact.
    #[error("malformed tree result under node key '{key}'")]
    MalformedTreeResult { key: String },

    /// Se solicitó un build mientras otro está activo (no fatal, no-op).
    #[error("a build is already in progress")]
    ConcurrentBuildRejected,

    /// No hay asset de entrada configurado; el build no llega a iniciarse.
    #[error("no input asset configured")]
    NoInputAsset,

    /// La ejecución de un job de un step falló. Política: falla el batch
    /// completo, se omiten los stages restantes y se reporta el fallo.
    #[error("step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// Operación sobre un scheduler ya liberado.
    #[error("scheduler is shut down")]
    SchedulerShutDown,

    #[error("internal: {0}")]
    Internal(String),
}
