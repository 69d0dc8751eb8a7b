//! forge-core: motor de orquestación de builds de assets.
//!
//! Convierte una descripción declarativa en un árbol de artifacts derivados
//! corriendo un pipeline configurable de stages independientes, cada uno con
//! fan-out en múltiples jobs sobre un pool acotado de workers, fusionando
//! resultados en un contexto compartido y ensamblando el árbol de salida.

pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod model;
pub mod scene;
pub mod scheduler;
pub mod step;

pub use config::BuildConfig;
pub use engine::{BuildEngine, BuildReport, BuildService, BuildSignal, BuildState, ResultMerger};
pub use errors::BuildError;
pub use model::{BuildContext, CtxValue, NodeArtifact, TreeFragment};
pub use scene::SceneHost;
pub use scheduler::{Job, JobId, JobScheduler};
pub use step::{BuildStep, FanOut, FixedPipeline, JobResult, PipelineProvider, StepRunResult};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct NullHost;
    impl SceneHost for NullHost {
        fn attach(&self, _parent: Option<&NodeArtifact>, _child: &NodeArtifact) {}
        fn assign_owner(&self, _node: &NodeArtifact, _owner: &NodeArtifact) {}
        fn children(&self, _node: &NodeArtifact) -> Vec<NodeArtifact> {
            Vec::new()
        }
    }

    struct SeedStep;

    #[async_trait]
    impl BuildStep for SeedStep {
        fn name(&self) -> &str {
            "seed"
        }
        fn fan_out(&self) -> FanOut {
            FanOut::Single
        }
        async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
            StepRunResult::success([("entities".to_string(),
                                     CtxValue::leaf(json!([{ "classname": "worldspawn" },
                                                           { "classname": "light" }])))])
        }
    }

    struct TagStep;

    #[async_trait]
    impl BuildStep for TagStep {
        fn name(&self) -> &str {
            "tag"
        }
        fn fan_out(&self) -> FanOut {
            FanOut::PerEntity
        }
        async fn run(&self, ctx: &BuildContext) -> StepRunResult {
            let index = ctx.get(constants::ENTITY_INDEX_KEY)
                           .and_then(CtxValue::as_leaf)
                           .and_then(|v| v.as_u64())
                           .unwrap_or(0);
            StepRunResult::success([("tags".to_string(),
                                     CtxValue::nested([(index.to_string(), CtxValue::leaf(json!("ok")))]))])
        }
    }

    #[tokio::test]
    async fn minimal_pipeline_merges_per_entity_results() {
        let config = BuildConfig::with_map("demo.map");
        let steps: Vec<Arc<dyn BuildStep>> = vec![Arc::new(SeedStep), Arc::new(TagStep)];
        let mut engine = BuildEngine::new(config, steps, Arc::new(NullHost));

        let report = engine.run().await.expect("build should complete");
        assert_eq!(engine.state(), BuildState::Complete);

        let tags = report.context.get("tags").unwrap().as_nested().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(report.context.contains(constants::CONFIG_KEY));
        assert!(report.context.contains(constants::ENTITY_DEFS_KEY));
    }

    #[tokio::test]
    async fn build_without_input_asset_is_rejected_idle() {
        let steps: Vec<Arc<dyn BuildStep>> = vec![Arc::new(SeedStep)];
        let mut engine = BuildEngine::new(BuildConfig::default(), steps, Arc::new(NullHost));
        let err = engine.run().await.unwrap_err();
        assert_eq!(err, BuildError::NoInputAsset);
        assert_eq!(engine.state(), BuildState::Idle);
    }
}
