//! Core BuildEngine implementation.
//!
//! Máquina de estados del build:
//! `Idle → Initializing → Running(i) → Finalizing → Complete | Failed`.
//! Por stage hay exactamente un punto de suspensión visible: esperar la
//! completitud del batch. El shutdown del scheduler corre exactamente una
//! vez en todo camino de salida, antes de reportar el resultado; la fase de
//! finalize nunca corre después de un error fatal.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::BuildConfig;
use crate::constants;
use crate::errors::BuildError;
use crate::model::{BuildContext, CtxValue, NodeArtifact, TreeFragment};
use crate::scene::SceneHost;
use crate::scheduler::{JobId, JobScheduler};
use crate::step::{BuildStep, JobResult, PipelineProvider, StepRunResult};
use super::fanout;
use super::merge::ResultMerger;
use super::signal::BuildSignal;

/// Estado del build como condición de primera clase e inspeccionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Initializing,
    Running(usize),
    Finalizing,
    Complete,
    Failed,
}

/// Snapshot del resultado de un build exitoso.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub build_id: Uuid,
    pub context: BuildContext,
    pub tree: TreeFragment,
    pub managed_nodes: Vec<Uuid>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct BuildEngine {
    config: BuildConfig,
    steps: Vec<Arc<dyn BuildStep>>,
    host: Arc<dyn SceneHost>,
    state: BuildState,
    signals: broadcast::Sender<BuildSignal>,
}

impl BuildEngine {
    pub fn new(config: BuildConfig, steps: Vec<Arc<dyn BuildStep>>, host: Arc<dyn SceneHost>) -> Self {
        let (signals, _) = broadcast::channel(8);
        Self::with_signals(config, steps, host, signals)
    }

    /// Variante que comparte un canal de señales ya existente (la usa el
    /// servicio de builds para que sus suscriptores vean las señales).
    pub fn with_signals(config: BuildConfig,
                        steps: Vec<Arc<dyn BuildStep>>,
                        host: Arc<dyn SceneHost>,
                        signals: broadcast::Sender<BuildSignal>)
                        -> Self {
        Self { config,
               steps,
               host,
               state: BuildState::Idle,
               signals }
    }

    pub fn from_provider(config: BuildConfig, provider: &dyn PipelineProvider, host: Arc<dyn SceneHost>) -> Self {
        Self::new(config, provider.get_build_steps(), host)
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuildSignal> {
        self.signals.subscribe()
    }

    /// Ejecuta el build completo.
    pub async fn run(&mut self) -> Result<BuildReport, BuildError> {
        // Fail-fast: ambos chequeos dejan el estado tal como estaba.
        if !matches!(self.state, BuildState::Idle | BuildState::Complete | BuildState::Failed) {
            warn!("[engine] build ya activo, solicitud rechazada");
            return Err(BuildError::ConcurrentBuildRejected);
        }
        let Some(map_path) = self.config.map_path.clone() else {
            warn!("[engine] sin asset de entrada configurado, build rechazado");
            return Err(BuildError::NoInputAsset);
        };

        self.state = BuildState::Initializing;
        let build_id = Uuid::new_v4();
        let started_at = Utc::now();
        let _ = self.signals.send(BuildSignal::Started);
        info!("[engine] build {} iniciado: '{}' ({} stages, workers={}, bucket={})",
              build_id,
              map_path,
              self.steps.len(),
              self.config.workers,
              self.config.bucket_size);

        let mut scheduler = JobScheduler::new(self.config.workers, self.config.bucket_size);
        let mut context = BuildContext::new();
        let root = NodeArtifact::new(root_name(&map_path), "MapRoot", json!({ "map_path": map_path }));
        let mut merger = ResultMerger::new(Arc::clone(&self.host), root);

        let outcome = match self.seed_context(&mut context) {
            Ok(()) => self.run_stages(&mut scheduler, &mut context, &mut merger).await,
            Err(e) => Err(e),
        };

        // Limpieza determinista: liberar el pool exactamente una vez, en
        // todo camino, antes de reportar el resultado.
        scheduler.shutdown().await;

        if let Err(e) = outcome {
            return Err(self.fail(build_id, e));
        }

        self.state = BuildState::Finalizing;
        if let Err(e) = self.run_finalize(&mut context, &mut merger).await {
            return Err(self.fail(build_id, e));
        }

        self.state = BuildState::Complete;
        let _ = self.signals.send(BuildSignal::Completed);
        let report = BuildReport { build_id,
                                   context,
                                   tree: merger.tree().clone(),
                                   managed_nodes: merger.managed_nodes(),
                                   started_at,
                                   finished_at: Utc::now() };
        info!("[engine] build {} completo ({} nodos, {} claves de contexto)",
              build_id,
              report.tree.node_count(),
              report.context.len());
        Ok(report)
    }

    /// Siembra la configuración estática en el contexto.
    fn seed_context(&self, context: &mut BuildContext) -> Result<(), BuildError> {
        context.set(constants::CONFIG_KEY, self.config.to_ctx_value())?;
        context.set(constants::ENTITY_DEFS_KEY, self.entity_definitions())?;
        Ok(())
    }

    /// Lookup de definiciones de entidad. Si hay una fuente configurada se
    /// referencia; el set base cubre las clases que el pipeline por defecto
    /// conoce.
    fn entity_definitions(&self) -> CtxValue {
        CtxValue::leaf(json!({
            "source": self.config.entity_definitions_path,
            "classes": {
                "worldspawn": { "solid": true },
                "func_door": { "solid": true, "movable": true },
                "light": { "solid": false, "point": true }
            }
        }))
    }

    async fn run_stages(&mut self,
                        scheduler: &mut JobScheduler,
                        context: &mut BuildContext,
                        merger: &mut ResultMerger)
                        -> Result<(), BuildError> {
        let steps = self.steps.clone();
        for (index, step) in steps.iter().enumerate() {
            self.state = BuildState::Running(index);
            if !self.config.step_enabled(step.name()) {
                info!("[engine] stage {index} '{}' deshabilitado, se omite", step.name());
                continue;
            }

            let jobs = fanout::expand(step, context)?;
            debug!("[engine] stage {index} '{}' fan-out en {} jobs", step.name(), jobs.len());
            for job in jobs {
                scheduler.submit(job)?;
            }

            // Único punto de suspensión del stage.
            let batch = scheduler.run_batch().await?;
            let successes = collect_batch(step.name(), batch)?;
            merger.merge_batch(context, successes)?;
        }
        Ok(())
    }

    /// Pasada secuencial de finalize, en orden original de pipeline. Una
    /// clave de finalize ausente es una omisión local no fatal, a
    /// diferencia del comportamiento fatal durante la fase de run.
    async fn run_finalize(&mut self, context: &mut BuildContext, merger: &mut ResultMerger) -> Result<(), BuildError> {
        let steps = self.steps.clone();
        for step in steps.iter().filter(|s| s.wants_finalize()) {
            let slice = match context.slice(step.name(), &step.finalize_inputs()) {
                Ok(slice) => slice,
                Err(BuildError::MissingDependency { step, key }) => {
                    warn!("[engine] finalize de '{step}' omitido: falta '{key}'");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match step.finalize(&slice).await {
                StepRunResult::Success { output } => merger.merge_result(context, output)?,
                StepRunResult::Failure { error } => {
                    return Err(BuildError::StepFailed { step: step.name().to_string(),
                                                        message: error.to_string() })
                }
            }
        }
        Ok(())
    }

    fn fail(&mut self, build_id: Uuid, error: BuildError) -> BuildError {
        self.state = BuildState::Failed;
        error!("[engine] build {build_id} fallido: {error}");
        let _ = self.signals.send(BuildSignal::Failed);
        error
    }
}

/// Separa los éxitos del batch; cualquier fallo hace fallar el batch entero
/// (el primero en orden de `JobId`, para que el error sea determinista).
fn collect_batch(step: &str,
                 batch: HashMap<JobId, StepRunResult>)
                 -> Result<HashMap<JobId, JobResult>, BuildError> {
    let mut ids: Vec<JobId> = batch.keys().copied().collect();
    ids.sort();
    let mut batch = batch;
    let mut successes = HashMap::with_capacity(ids.len());
    for id in ids {
        match batch.remove(&id) {
            Some(StepRunResult::Success { output }) => {
                successes.insert(id, output);
            }
            Some(StepRunResult::Failure { error }) => {
                return Err(BuildError::StepFailed { step: step.to_string(),
                                                    message: format!("job {id}: {error}") });
            }
            None => {}
        }
    }
    Ok(successes)
}

fn root_name(map_path: &str) -> String {
    map_path.rsplit(['/', '\\'])
            .next()
            .and_then(|f| f.split('.').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("map")
            .to_string()
}
