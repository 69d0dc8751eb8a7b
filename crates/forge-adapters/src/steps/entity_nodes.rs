//! EntityNodeStep (PerEntity): produce el nodo de escena de cada entidad
//! bajo la clave estructural, como fragmento `entity_<i>` top-level.

use async_trait::async_trait;
use serde_json::{json, Value};

use forge_core::constants;
use forge_core::{BuildContext, BuildStep, CtxValue, FanOut, NodeArtifact, StepRunResult};

pub struct EntityNodeStep;

fn classname(entity: &Value) -> &str {
    entity.get("classname").and_then(Value::as_str).unwrap_or("unknown")
}

fn node_class(classname: &str) -> &'static str {
    match classname {
        "worldspawn" => "StaticBody",
        "func_door" => "AnimatableBody",
        "light" => "LightNode",
        _ => "Node",
    }
}

#[async_trait]
impl BuildStep for EntityNodeStep {
    fn name(&self) -> &str {
        "entity_nodes"
    }

    fn fan_out(&self) -> FanOut {
        FanOut::PerEntity
    }

    async fn run(&self, ctx: &BuildContext) -> StepRunResult {
        let index = ctx.get(constants::ENTITY_INDEX_KEY)
                       .and_then(CtxValue::as_leaf)
                       .and_then(Value::as_u64)
                       .unwrap_or(0);
        let entity = ctx.get(constants::ENTITY_KEY)
                        .and_then(CtxValue::as_leaf)
                        .cloned()
                        .unwrap_or(Value::Null);
        let class = classname(&entity);

        let mut node = NodeArtifact::new(format!("entity_{index}_{class}"),
                                         node_class(class),
                                         json!({ "classname": class, "entity_index": index }));
        // Las luces llegan pre-envueltas por el subsistema de iluminación
        // del host: ownership top-level directo, sin descender.
        if class == "light" {
            node = node.with_external_wrap();
        }

        StepRunResult::success([(constants::TREE_KEY.to_string(),
                                 CtxValue::nested([(format!("entity_{index}"), CtxValue::Node(node))]))])
    }
}
