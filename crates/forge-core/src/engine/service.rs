//! Servicio de builds: ejecuta cada build en una tarea dedicada.
//!
//! El caller nunca se bloquea: `request_build` despacha el build completo a
//! una tarea tokio propia y retorna de inmediato. Una única bandera de
//! actividad garantiza que jamás hay más de un build en vuelo; la solicitud
//! concurrente se loggea y es un no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::broadcast;

use crate::config::BuildConfig;
use crate::scene::SceneHost;
use crate::step::PipelineProvider;
use super::core::BuildEngine;
use super::signal::BuildSignal;

pub struct BuildService {
    config: BuildConfig,
    provider: Arc<dyn PipelineProvider>,
    host: Arc<dyn SceneHost>,
    active: Arc<AtomicBool>,
    signals: broadcast::Sender<BuildSignal>,
}

impl BuildService {
    pub fn new(config: BuildConfig, provider: Arc<dyn PipelineProvider>, host: Arc<dyn SceneHost>) -> Self {
        let (signals, _) = broadcast::channel(16);
        Self { config,
               provider,
               host,
               active: Arc::new(AtomicBool::new(false)),
               signals }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuildSignal> {
        self.signals.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Solicita un build. Retorna `false` (no-op) si ya hay uno activo; el
    /// build activo no se ve afectado y no se crea un segundo scheduler.
    pub fn request_build(&self) -> bool {
        if self.active.swap(true, Ordering::SeqCst) {
            warn!("[service] build en curso, solicitud rechazada");
            return false;
        }

        let config = self.config.clone();
        let steps = self.provider.get_build_steps();
        let host = Arc::clone(&self.host);
        let signals = self.signals.clone();
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            let mut engine = BuildEngine::with_signals(config, steps, host, signals);
            match engine.run().await {
                Ok(report) => debug!("[service] build {} completo ({} nodos)",
                                     report.build_id,
                                     report.managed_nodes.len()),
                Err(e) => error!("[service] build fallido: {e}"),
            }
            // La bandera se limpia en todo camino de salida.
            active.store(false, Ordering::SeqCst);
        });
        true
    }
}
