//! Pool acotado de workers sobre tareas tokio.
//!
//! - `submit` encola sin prometer orden alguno al caller.
//! - `run_batch` ejecuta todo lo encolado respetando la cota de workers,
//!   despachando en buckets, y suspende al caller hasta que el batch entero
//!   terminó. El tamaño de bucket es un knob de throughput/memoria, nunca de
//!   correctitud.
//! - `shutdown` libera el pool; es seguro llamarlo exactamente una vez por
//!   build y debe completar antes de que el engine avance de la limpieza.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::constants;
use crate::errors::BuildError;
use crate::step::StepRunResult;
use super::job::{Job, JobId};

pub struct JobScheduler {
    workers: usize,
    bucket_size: usize,
    queue: Vec<Job>,
    semaphore: Arc<Semaphore>,
    shut_down: bool,
}

impl JobScheduler {
    pub fn new(workers: usize, bucket_size: usize) -> Self {
        let workers = workers.max(1);
        let bucket_size = bucket_size.max(1);
        debug!("[scheduler] pool creado (workers={workers}, bucket={bucket_size})");
        Self { workers,
               bucket_size,
               queue: Vec::new(),
               semaphore: Arc::new(Semaphore::new(workers)),
               shut_down: false }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Encola un job. Valida la declaración del step: requerir la clave
    /// reservada del scheduler se rechaza aquí, antes de correr ningún job.
    pub fn submit(&mut self, job: Job) -> Result<(), BuildError> {
        if self.shut_down {
            return Err(BuildError::SchedulerShutDown);
        }
        for key in job.step.required_inputs() {
            if key == constants::SCHEDULER_KEY {
                return Err(BuildError::InvalidStepDeclaration { step: job.step.name().to_string(),
                                                                key });
            }
        }
        self.queue.push(job);
        Ok(())
    }

    /// Ejecuta todos los jobs encolados y retorna sus resultados indexados
    /// por `JobId`. Todos los jobs del batch se esperan hasta terminar; no
    /// hay cancelación a mitad de batch.
    pub async fn run_batch(&mut self) -> Result<HashMap<JobId, StepRunResult>, BuildError> {
        if self.shut_down {
            return Err(BuildError::SchedulerShutDown);
        }
        let mut pending = std::mem::take(&mut self.queue);
        let mut results: HashMap<JobId, StepRunResult> = HashMap::with_capacity(pending.len());

        while !pending.is_empty() {
            let rest = pending.split_off(pending.len().min(self.bucket_size));
            let bucket = std::mem::replace(&mut pending, rest);

            let mut in_flight = JoinSet::new();
            for job in bucket {
                let semaphore = Arc::clone(&self.semaphore);
                in_flight.spawn(async move {
                    let permit = match semaphore.acquire_owned().await {
                        Ok(p) => p,
                        Err(_) => {
                            return (job.id, StepRunResult::Failure { error: BuildError::SchedulerShutDown })
                        }
                    };
                    let result = job.step.run(&job.ctx).await;
                    drop(permit);
                    (job.id, result)
                });
            }
            while let Some(joined) = in_flight.join_next().await {
                let (id, result) = joined.map_err(|e| BuildError::Internal(format!("worker panicked: {e}")))?;
                results.insert(id, result);
            }
        }
        Ok(results)
    }

    /// Libera los recursos del pool. Idempotente por bandera; el duplicado
    /// se loggea y se ignora.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            warn!("[scheduler] shutdown duplicado ignorado");
            return;
        }
        self.shut_down = true;
        self.semaphore.close();
        self.queue.clear();
        debug!("[scheduler] pool liberado (workers={})", self.workers);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}
