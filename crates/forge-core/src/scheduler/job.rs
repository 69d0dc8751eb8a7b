use std::fmt;
use std::sync::Arc;

use crate::model::BuildContext;
use crate::step::BuildStep;

/// Identificador de job dentro de un batch. Las claves de resultado del
/// batch se indexan por él, de modo que el caller reconstruye una salida
/// determinista sin importar el orden real de terminación de los workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobId {
    /// Job único de un step Single.
    Single,
    /// Job de la entidad de índice dado.
    Entity(usize),
    /// Job del brush (entidad, brush) de índices dados.
    Brush(usize, usize),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobId::Single => write!(f, "single"),
            JobId::Entity(e) => write!(f, "entity[{e}]"),
            JobId::Brush(e, b) => write!(f, "brush[{e}.{b}]"),
        }
    }
}

/// Par (step, slice privado de contexto) listo para ejecutar.
///
/// El slice es una copia restringida a las claves declaradas por el step más
/// las claves propias del fan-out; los jobs nunca comparten una instancia
/// mutable de contexto, que es el invariante que hace la ejecución
/// concurrente libre de carreras.
pub struct Job {
    pub id: JobId,
    pub step: Arc<dyn BuildStep>,
    pub ctx: BuildContext,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("step", &self.step.name())
            .field("ctx", &self.ctx)
            .finish()
    }
}
