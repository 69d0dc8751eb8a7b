//! Señales de completitud expuestas al caller.
//!
//! Notificaciones one-shot sin payload: el resultado visible de un build es
//! binario (completo o fallido).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSignal {
    Started,
    Completed,
    Failed,
}
