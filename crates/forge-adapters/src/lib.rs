//! forge-adapters: steps concretos de demo, host de grabación y pipeline
//! por defecto para el motor de builds.

pub mod host;
pub mod pipeline;
pub mod steps;

pub use host::RecordingSceneHost;
pub use pipeline::DefaultPipelineProvider;
