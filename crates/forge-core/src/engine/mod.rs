//! Orquestación del build: fan-out, fusión de resultados, máquina de
//! estados y servicio de ejecución.

mod core;
pub mod fanout;
mod merge;
mod service;
mod signal;

pub use core::{BuildEngine, BuildReport, BuildState};
pub use merge::ResultMerger;
pub use service::BuildService;
pub use signal::BuildSignal;
