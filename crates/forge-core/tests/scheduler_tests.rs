//! Pruebas del pool acotado de workers: resultados indexados, cota de
//! concurrencia, buckets y semántica de shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use forge_core::constants;
use forge_core::{BuildContext, BuildError, BuildStep, CtxValue, FanOut, Job, JobId, JobScheduler, StepRunResult};

/// Step que reporta su propio índice leído del slice privado.
struct EchoStep;

#[async_trait]
impl BuildStep for EchoStep {
    fn name(&self) -> &str {
        "echo"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::PerEntity
    }
    async fn run(&self, ctx: &BuildContext) -> StepRunResult {
        let n = ctx.get("n").and_then(CtxValue::as_leaf).cloned().unwrap();
        StepRunResult::success([("n_out".to_string(), CtxValue::Leaf(n))])
    }
}

/// Step que mide la concurrencia observada dentro del pool.
struct GaugeStep {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl BuildStep for GaugeStep {
    fn name(&self) -> &str {
        "gauge"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::PerEntity
    }
    async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(15)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        StepRunResult::empty()
    }
}

struct GreedyStep;

#[async_trait]
impl BuildStep for GreedyStep {
    fn name(&self) -> &str {
        "greedy"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::Single
    }
    fn required_inputs(&self) -> Vec<String> {
        vec![constants::SCHEDULER_KEY.to_string()]
    }
    async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
        StepRunResult::empty()
    }
}

fn echo_job(step: &Arc<dyn BuildStep>, i: usize) -> Job {
    let mut ctx = BuildContext::new();
    ctx.set("n", CtxValue::leaf(json!(i))).unwrap();
    Job { id: JobId::Entity(i),
          step: Arc::clone(step),
          ctx }
}

#[tokio::test]
async fn batch_results_are_keyed_by_job_id() {
    let mut scheduler = JobScheduler::new(3, 2);
    let step: Arc<dyn BuildStep> = Arc::new(EchoStep);
    for i in 0..7 {
        scheduler.submit(echo_job(&step, i)).unwrap();
    }
    assert_eq!(scheduler.queued(), 7);

    let results = scheduler.run_batch().await.unwrap();
    assert_eq!(results.len(), 7);
    for i in 0..7 {
        let result = results.get(&JobId::Entity(i)).unwrap();
        match result {
            StepRunResult::Success { output } => {
                assert_eq!(output["n_out"].as_leaf().unwrap(), &json!(i));
            }
            StepRunResult::Failure { .. } => panic!("job {i} should succeed"),
        }
    }
    assert_eq!(scheduler.queued(), 0);
}

#[tokio::test]
async fn worker_bound_is_respected() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let step: Arc<dyn BuildStep> = Arc::new(GaugeStep { current: current.clone(),
                                                        peak: peak.clone() });

    let mut scheduler = JobScheduler::new(2, 16);
    for i in 0..8 {
        scheduler.submit(Job { id: JobId::Entity(i),
                               step: Arc::clone(&step),
                               ctx: BuildContext::new() })
                 .unwrap();
    }
    scheduler.run_batch().await.unwrap();
    assert!(peak.load(Ordering::SeqCst) <= 2, "peak {} > workers", peak.load(Ordering::SeqCst));
}

#[tokio::test]
async fn bucket_size_does_not_affect_completeness() {
    let step: Arc<dyn BuildStep> = Arc::new(EchoStep);
    let mut scheduler = JobScheduler::new(4, 1);
    for i in 0..5 {
        scheduler.submit(echo_job(&step, i)).unwrap();
    }
    let results = scheduler.run_batch().await.unwrap();
    assert_eq!(results.len(), 5);
}

#[tokio::test]
async fn declaring_scheduler_key_is_rejected_at_submit() {
    let mut scheduler = JobScheduler::new(2, 4);
    let step: Arc<dyn BuildStep> = Arc::new(GreedyStep);
    let err = scheduler.submit(Job { id: JobId::Single,
                                     step,
                                     ctx: BuildContext::new() })
                       .unwrap_err();
    assert_eq!(err,
               BuildError::InvalidStepDeclaration { step: "greedy".into(),
                                                    key: constants::SCHEDULER_KEY.into() });
    // Nada quedó encolado: se rechazó antes de correr ningún job.
    assert_eq!(scheduler.queued(), 0);
}

#[tokio::test]
async fn shutdown_is_idempotent_and_blocks_further_use() {
    let mut scheduler = JobScheduler::new(2, 4);
    scheduler.shutdown().await;
    scheduler.shutdown().await; // duplicado: se ignora
    assert!(scheduler.is_shut_down());

    let step: Arc<dyn BuildStep> = Arc::new(EchoStep);
    let err = scheduler.submit(echo_job(&step, 0)).unwrap_err();
    assert_eq!(err, BuildError::SchedulerShutDown);
    let err = scheduler.run_batch().await.unwrap_err();
    assert_eq!(err, BuildError::SchedulerShutDown);
}
