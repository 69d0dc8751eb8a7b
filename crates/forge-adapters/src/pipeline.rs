//! Pipeline por defecto: parseo, nodos de entidad, geometría por brush y
//! resolución de materiales, en ese orden fijo.

use std::sync::Arc;

use forge_core::{BuildStep, PipelineProvider};

use crate::steps::{BrushGeometryStep, EntityNodeStep, MaterialResolveStep, ParseMapStep};

pub struct DefaultPipelineProvider;

impl PipelineProvider for DefaultPipelineProvider {
    fn get_build_steps(&self) -> Vec<Arc<dyn BuildStep>> {
        vec![Arc::new(ParseMapStep),
             Arc::new(EntityNodeStep),
             Arc::new(BrushGeometryStep),
             Arc::new(MaterialResolveStep)]
    }
}
