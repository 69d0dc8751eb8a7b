//! Pruebas de integración del engine: pipeline completo, propiedades del
//! contexto final, caminos de fallo y servicio de builds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use tokio::sync::Notify;

use forge_adapters::{DefaultPipelineProvider, RecordingSceneHost};
use forge_core::constants;
use forge_core::{BuildConfig, BuildContext, BuildEngine, BuildError, BuildService, BuildSignal, BuildState,
                 BuildStep, CtxValue, FanOut, FixedPipeline, PipelineProvider, StepRunResult};

fn demo_config() -> BuildConfig {
    BuildConfig::with_map("maps/demo.map")
}

#[tokio::test]
async fn default_pipeline_builds_full_tree_and_context() {
    let host = Arc::new(RecordingSceneHost::new());
    let mut engine = BuildEngine::from_provider(demo_config(), &DefaultPipelineProvider, host.clone());

    let report = engine.run().await.expect("build should complete");
    assert_eq!(engine.state(), BuildState::Complete);

    // Claves finales = semilla ∪ resultados de cada stage ∪ finalize.
    let mut keys: Vec<&str> = report.context.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys,
               vec!["config", "entities", "entity_brushes", "entity_definitions", "material_summary",
                    "materials", "texture_list"]);

    // Ejemplo del contrato: 3 entidades -> materials con 3 entradas;
    // texture_list con 2 items.
    assert_eq!(report.context.get("texture_list").unwrap().as_array().unwrap().len(), 2);
    assert_eq!(report.context.get("materials").unwrap().as_nested().unwrap().len(), 3);
    assert_eq!(report.context.get("material_summary").unwrap().as_leaf().unwrap(),
               &json!({ "resolved": 3 }));

    // Árbol: raíz + 3 entidades + 3 brushes (2 + 0 + 1).
    assert_eq!(report.tree.node_count(), 7);
    assert!(report.tree.find(&["entity_0", "brush_0"]).is_some());
    assert!(report.tree.find(&["entity_0", "brush_1"]).is_some());
    assert!(report.tree.find(&["entity_2", "brush_0"]).is_some());
    assert_eq!(report.managed_nodes.len(), 6);
    assert_eq!(host.attach_count(), 6);

    // La luz llega pre-envuelta: exactamente una asignación de owner.
    assert_eq!(host.owner_assignments_for("entity_1_light"), 1);
}

#[tokio::test]
async fn repeated_builds_produce_identical_contexts() {
    let run = || async {
        let host = Arc::new(RecordingSceneHost::new());
        let mut engine = BuildEngine::from_provider(demo_config(), &DefaultPipelineProvider, host);
        engine.run().await.expect("build should complete").context
    };
    let a = run().await;
    let b = run().await;
    assert_eq!(a, b);
}

/// Step Single que exige una clave que nadie produce.
struct NeedsAtlasStep {
    finalized: Arc<AtomicBool>,
}

#[async_trait]
impl BuildStep for NeedsAtlasStep {
    fn name(&self) -> &str {
        "needs_atlas"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::Single
    }
    fn required_inputs(&self) -> Vec<String> {
        vec!["uv_atlas".to_string()]
    }
    fn wants_finalize(&self) -> bool {
        true
    }
    async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
        StepRunResult::empty()
    }
    async fn finalize(&self, _ctx: &BuildContext) -> StepRunResult {
        self.finalized.store(true, Ordering::SeqCst);
        StepRunResult::empty()
    }
}

#[tokio::test]
async fn missing_dependency_aborts_without_finalize() {
    let finalized = Arc::new(AtomicBool::new(false));
    let steps: Vec<Arc<dyn BuildStep>> = vec![Arc::new(NeedsAtlasStep { finalized: finalized.clone() })];
    let host = Arc::new(RecordingSceneHost::new());
    let mut engine = BuildEngine::new(demo_config(), steps, host);
    let mut signals = engine.subscribe();

    let err = engine.run().await.unwrap_err();
    assert_eq!(err,
               BuildError::MissingDependency { step: "needs_atlas".into(),
                                               key: "uv_atlas".into() });
    assert_eq!(engine.state(), BuildState::Failed);
    // La fase de finalize nunca corre tras un error fatal.
    assert!(!finalized.load(Ordering::SeqCst));
    assert_eq!(signals.try_recv().unwrap(), BuildSignal::Started);
    assert_eq!(signals.try_recv().unwrap(), BuildSignal::Failed);
}

struct DeclaresPoolStep;

#[async_trait]
impl BuildStep for DeclaresPoolStep {
    fn name(&self) -> &str {
        "declares_pool"
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

#[tokio::test]
async fn declaring_the_scheduler_fails_the_build_before_any_job() {
    let steps: Vec<Arc<dyn BuildStep>> = vec![Arc::new(DeclaresPoolStep)];
    let host = Arc::new(RecordingSceneHost::new());
    let mut engine = BuildEngine::new(demo_config(), steps, host);

    let err = engine.run().await.unwrap_err();
    assert_eq!(err,
               BuildError::InvalidStepDeclaration { step: "declares_pool".into(),
                                                    key: constants::SCHEDULER_KEY.into() });
    assert_eq!(engine.state(), BuildState::Failed);
}

/// PerEntity que falla en la entidad 1.
struct FlakyStep;

#[async_trait]
impl BuildStep for FlakyStep {
    fn name(&self) -> &str {
        "flaky"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::PerEntity
    }
    async fn run(&self, ctx: &BuildContext) -> StepRunResult {
        let index = ctx.get(constants::ENTITY_INDEX_KEY)
                       .and_then(CtxValue::as_leaf)
                       .and_then(|v| v.as_u64())
                       .unwrap_or(0);
        if index == 1 {
            return StepRunResult::Failure { error: BuildError::Internal("bad entity".into()) };
        }
        StepRunResult::success([("ok".to_string(),
                                 CtxValue::nested([(index.to_string(), CtxValue::leaf(json!(true)))]))])
    }
}

struct NeverRunsStep {
    ran: Arc<AtomicBool>,
}

#[async_trait]
impl BuildStep for NeverRunsStep {
    fn name(&self) -> &str {
        "never_runs"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::Single
    }
    async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
        self.ran.store(true, Ordering::SeqCst);
        StepRunResult::empty()
    }
}

#[tokio::test]
async fn failing_job_fails_whole_batch_and_skips_remaining_stages() {
    let ran = Arc::new(AtomicBool::new(false));
    let steps: Vec<Arc<dyn BuildStep>> =
        vec![Arc::new(forge_adapters::steps::ParseMapStep),
             Arc::new(FlakyStep),
             Arc::new(NeverRunsStep { ran: ran.clone() })];
    let host = Arc::new(RecordingSceneHost::new());
    let mut engine = BuildEngine::new(demo_config(), steps, host);

    let err = engine.run().await.unwrap_err();
    match err {
        BuildError::StepFailed { step, .. } => assert_eq!(step, "flaky"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.state(), BuildState::Failed);
    assert!(!ran.load(Ordering::SeqCst), "los stages posteriores no deben correr");
}

#[tokio::test]
async fn disabled_stage_is_skipped_and_build_completes() {
    let mut config = demo_config();
    config.disabled_steps = vec!["brush_geometry".to_string()];
    let host = Arc::new(RecordingSceneHost::new());
    let mut engine = BuildEngine::from_provider(config, &DefaultPipelineProvider, host);

    let report = engine.run().await.expect("build should complete");
    // Sin geometría: raíz + 3 nodos de entidad.
    assert_eq!(report.tree.node_count(), 4);
    assert!(report.tree.find(&["entity_0", "brush_0"]).is_none());
}

/// Finalize cuyo input falta: omisión local, no fatal.
struct OptionalSummaryStep;

#[async_trait]
impl BuildStep for OptionalSummaryStep {
    fn name(&self) -> &str {
        "optional_summary"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::Single
    }
    fn finalize_inputs(&self) -> Vec<String> {
        vec!["never_produced".to_string()]
    }
    fn wants_finalize(&self) -> bool {
        true
    }
    async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
        StepRunResult::success([("marker".to_string(), CtxValue::leaf(json!(1)))])
    }
    async fn finalize(&self, _ctx: &BuildContext) -> StepRunResult {
        StepRunResult::success([("summary".to_string(), CtxValue::leaf(json!("unreachable")))])
    }
}

#[tokio::test]
async fn missing_finalize_input_is_skipped_not_fatal() {
    let steps: Vec<Arc<dyn BuildStep>> = vec![Arc::new(OptionalSummaryStep)];
    let host = Arc::new(RecordingSceneHost::new());
    let mut engine = BuildEngine::new(demo_config(), steps, host);

    let report = engine.run().await.expect("build should still complete");
    assert!(report.context.contains("marker"));
    assert!(!report.context.contains("summary"));
}

/// Step Single que se queda suspendido hasta que el test abre la compuerta,
/// dejando el build determinísticamente en vuelo.
struct GatedStep {
    gate: Arc<Notify>,
}

#[async_trait]
impl BuildStep for GatedStep {
    fn name(&self) -> &str {
        "gated"
    }
    fn fan_out(&self) -> FanOut {
        FanOut::Single
    }
    async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
        self.gate.notified().await;
        StepRunResult::empty()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_build_request_is_rejected_while_first_is_in_flight() {
    let gate = Arc::new(Notify::new());
    let steps: Vec<Arc<dyn BuildStep>> = vec![Arc::new(GatedStep { gate: gate.clone() })];
    let provider: Arc<dyn PipelineProvider> = Arc::new(FixedPipeline::new(steps));
    let service = BuildService::new(demo_config(), provider, Arc::new(RecordingSceneHost::new()));
    let mut signals = service.subscribe();

    assert!(service.request_build());
    assert_eq!(signals.recv().await.unwrap(), BuildSignal::Started);

    // El primer build sigue suspendido dentro del step: la bandera está
    // tomada y la segunda solicitud es un no-op, sin segundo scheduler.
    assert!(service.is_active());
    assert!(!service.request_build());

    gate.notify_one();
    assert_eq!(signals.recv().await.unwrap(), BuildSignal::Completed);

    // La bandera de actividad se limpia al terminar.
    for _ in 0..50 {
        if !service.is_active() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!service.is_active());

    gate.notify_one();
    assert!(service.request_build(), "terminado el build, una nueva solicitud procede");
    assert_eq!(signals.recv().await.unwrap(), BuildSignal::Started);
    assert_eq!(signals.recv().await.unwrap(), BuildSignal::Completed);
}
