//! MaterialResolveStep (PerEntity): resuelve el material de cada entidad a
//! partir de la lista de texturas y la configuración. Participa del
//! finalize para emitir un resumen agregado una vez que todos los stages
//! corrieron.

use async_trait::async_trait;
use serde_json::{json, Value};

use forge_core::constants;
use forge_core::{BuildContext, BuildStep, CtxValue, FanOut, StepRunResult};

pub struct MaterialResolveStep;

#[async_trait]
impl BuildStep for MaterialResolveStep {
    fn name(&self) -> &str {
        "material_resolve"
    }

    fn fan_out(&self) -> FanOut {
        FanOut::PerEntity
    }

    fn required_inputs(&self) -> Vec<String> {
        vec!["texture_list".to_string(), constants::CONFIG_KEY.to_string()]
    }

    fn finalize_inputs(&self) -> Vec<String> {
        vec!["materials".to_string()]
    }

    fn wants_finalize(&self) -> bool {
        true
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
        let classname = entity.get("classname").and_then(Value::as_str).unwrap_or("unknown");

        let config = ctx.get(constants::CONFIG_KEY).and_then(CtxValue::as_nested);
        let default_material = config.and_then(|c| c.get("default_material"))
                                     .and_then(CtxValue::as_leaf)
                                     .and_then(Value::as_str)
                                     .unwrap_or("default")
                                     .to_string();
        let extension = config.and_then(|c| c.get("material_extension"))
                              .and_then(CtxValue::as_leaf)
                              .and_then(Value::as_str)
                              .unwrap_or("tres")
                              .to_string();

        let textures = ctx.get("texture_list").and_then(CtxValue::as_array).cloned().unwrap_or_default();
        // Material de la entidad: su textura por índice si existe, si no el
        // material por defecto configurado.
        let material = textures.get(index as usize)
                               .and_then(Value::as_str)
                               .map(|t| format!("{t}.{extension}"))
                               .unwrap_or(format!("{default_material}.{extension}"));

        StepRunResult::success([("materials".to_string(),
                                 CtxValue::nested([(index.to_string(),
                                                    CtxValue::leaf(json!({ "classname": classname,
                                                                           "material": material })))]))])
    }

    async fn finalize(&self, ctx: &BuildContext) -> StepRunResult {
        let count = ctx.get("materials").and_then(CtxValue::as_nested).map_or(0, |m| m.len());
        StepRunResult::success([("material_summary".to_string(),
                                 CtxValue::leaf(json!({ "resolved": count })))])
    }
}
