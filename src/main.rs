use std::sync::Arc;

use forge_adapters::{DefaultPipelineProvider, RecordingSceneHost};
use forge_core::{BuildConfig, BuildEngine, BuildError, BuildService, BuildSignal, BuildState, PipelineProvider};

/// Validación D1: build completo con el pipeline por defecto, contexto
/// fusionado y árbol ensamblado sobre el host de grabación.
async fn run_d1_validation() {
    let host = Arc::new(RecordingSceneHost::new());
    let config = BuildConfig::with_map("maps/demo.map");
    let mut engine = BuildEngine::from_provider(config, &DefaultPipelineProvider, host.clone());

    let report = engine.run().await.expect("build demo ok");
    assert_eq!(engine.state(), BuildState::Complete, "D1: el build debe completar");

    println!("[D1] build {} completo", report.build_id);
    println!("[D1] claves de contexto: {:?}", report.context.keys().collect::<Vec<_>>());
    println!("[D1] nodos ensamblados: {} (attaches={})",
             report.tree.node_count(),
             host.attach_count());
    for (parent, child) in host.attaches() {
        println!("[D1]   attach {} <- {}", parent.unwrap_or_else(|| "(raíz implícita)".into()), child);
    }
    let materials = report.context.get("materials").and_then(|v| v.as_nested()).expect("materials ok");
    assert_eq!(materials.len(), 3, "D1: un material por entidad");
    println!("!Validación D1: OK (pipeline completo, contexto y árbol ensamblados)");
}

/// Validación D2: un step que declara una dependencia ausente aborta el
/// build con el error y el estado esperados, sin correr finalize.
async fn run_d2_validation() {
    let host = Arc::new(RecordingSceneHost::new());
    let mut config = BuildConfig::with_map("maps/demo.map");
    // Deshabilitar el parseo deja a los stages posteriores sin entidades.
    config.disabled_steps.push("parse_map".to_string());
    let mut engine = BuildEngine::from_provider(config, &DefaultPipelineProvider, host);

    let err = engine.run().await.expect_err("el build debe fallar");
    assert!(matches!(err, BuildError::MissingDependency { .. }),
            "D2: el primer stage sin insumos debe reportar la dependencia ausente");
    assert_eq!(engine.state(), BuildState::Failed, "D2: estado Failed tras abortar");
    println!("[D2] build abortado como se esperaba: {err}");
    println!("!Validación D2: OK (dependencia ausente aborta el build)");
}

/// Validación D3: el servicio de builds rechaza solicitudes concurrentes y
/// emite las señales Started/Completed.
async fn run_d3_validation() {
    use async_trait::async_trait;
    use forge_core::{BuildContext, BuildStep, FanOut, FixedPipeline, StepRunResult};
    use tokio::sync::Notify;

    // Step que se suspende hasta abrir la compuerta, para que el primer
    // build siga en vuelo cuando llega la segunda solicitud.
    struct GateStep {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl BuildStep for GateStep {
        fn name(&self) -> &str {
            "gate"
        }
        fn fan_out(&self) -> FanOut {
            FanOut::Single
        }
        async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
            self.gate.notified().await;
            StepRunResult::empty()
        }
    }

    let gate = Arc::new(Notify::new());
    let steps: Vec<Arc<dyn BuildStep>> = vec![Arc::new(GateStep { gate: gate.clone() })];
    let provider: Arc<dyn PipelineProvider> = Arc::new(FixedPipeline::new(steps));
    let host = Arc::new(RecordingSceneHost::new());
    let service = BuildService::new(BuildConfig::with_map("maps/demo.map"), provider, host);
    let mut signals = service.subscribe();

    assert!(service.request_build(), "D3: la primera solicitud procede");
    assert_eq!(signals.recv().await.expect("señal ok"), BuildSignal::Started);
    assert!(service.is_active(), "D3: el build sigue en vuelo tras la compuerta");
    assert!(!service.request_build(), "D3: la segunda solicitud es un no-op");
    println!("[D3] solicitud concurrente rechazada mientras el build corre");

    gate.notify_one();
    assert_eq!(signals.recv().await.expect("señal ok"), BuildSignal::Completed);
    println!("!Validación D3: OK (build único en vuelo y señales emitidas)");
}

#[tokio::main]
async fn main() {
    // Cargar variables de entorno desde .env si existe (antes de leer MAPFORGE_*)
    let _ = dotenvy::dotenv();
    // MAPFORGE_VERBOSE sube el filtro del logger; RUST_LOG lo puede refinar.
    let mut logs = env_logger::Builder::new();
    logs.filter_level(BuildConfig::from_env().log_filter());
    logs.parse_default_env();
    logs.init();

    run_d1_validation().await;
    run_d2_validation().await;
    run_d3_validation().await;
}
