//! BrushGeometryStep (PerBrush): genera el artifact de malla de cada brush
//! y lo anida bajo el fragmento de su entidad, de modo que el attach cuelgue
//! del nodo de entidad ya registrado en esa ruta.

use async_trait::async_trait;
use serde_json::{json, Value};

use forge_core::constants;
use forge_core::{BuildContext, BuildStep, CtxValue, FanOut, NodeArtifact, StepRunResult};

pub struct BrushGeometryStep;

#[async_trait]
impl BuildStep for BrushGeometryStep {
    fn name(&self) -> &str {
        "brush_geometry"
    }

    fn fan_out(&self) -> FanOut {
        FanOut::PerBrush
    }

    fn required_inputs(&self) -> Vec<String> {
        vec![constants::CONFIG_KEY.to_string()]
    }

    async fn run(&self, ctx: &BuildContext) -> StepRunResult {
        let entity_index = ctx.get(constants::ENTITY_INDEX_KEY)
                              .and_then(CtxValue::as_leaf)
                              .and_then(Value::as_u64)
                              .unwrap_or(0);
        let brush_index = ctx.get(constants::BRUSH_INDEX_KEY)
                             .and_then(CtxValue::as_leaf)
                             .and_then(Value::as_u64)
                             .unwrap_or(0);
        let brush = ctx.get(constants::BRUSH_KEY)
                       .and_then(CtxValue::as_leaf)
                       .cloned()
                       .unwrap_or(Value::Null);
        let unit_scale = ctx.get(constants::CONFIG_KEY)
                            .and_then(CtxValue::as_nested)
                            .and_then(|c| c.get("unit_scale"))
                            .and_then(CtxValue::as_leaf)
                            .and_then(Value::as_f64)
                            .unwrap_or(1.0);

        let texture = brush.get("texture").and_then(Value::as_str).unwrap_or("none");
        let planes = brush.get("planes").and_then(Value::as_u64).unwrap_or(0);

        let mesh = NodeArtifact::new(format!("brush_{entity_index}_{brush_index}"),
                                     "MeshInstance",
                                     json!({ "texture": texture,
                                             "planes": planes,
                                             "unit_scale": unit_scale }));

        StepRunResult::success([(constants::TREE_KEY.to_string(),
                                 CtxValue::nested([(format!("entity_{entity_index}"),
                                                    CtxValue::nested([(format!("brush_{brush_index}"),
                                                                       CtxValue::Node(mesh))]))]))])
    }
}
