//! ParseMapStep (Single).
//!
//! Paso de parseo de demo: deriva un mapa sintético y determinista a partir
//! de la configuración sembrada (sin IO externo; sólo estructuras en
//! memoria, como los datasets sintéticos de los steps de adquisición).
//! Produce la secuencia de entidades, la tabla de brushes por entidad y la
//! lista de texturas referenciadas.

use async_trait::async_trait;
use serde_json::json;

use forge_core::constants;
use forge_core::{BuildContext, BuildStep, CtxValue, FanOut, StepRunResult};

pub struct ParseMapStep;

#[async_trait]
impl BuildStep for ParseMapStep {
    fn name(&self) -> &str {
        "parse_map"
    }

    fn fan_out(&self) -> FanOut {
        FanOut::Single
    }

    fn required_inputs(&self) -> Vec<String> {
        vec![constants::CONFIG_KEY.to_string(), constants::ENTITY_DEFS_KEY.to_string()]
    }

    async fn run(&self, _ctx: &BuildContext) -> StepRunResult {
        // Contenido estable: 3 entidades, 3 brushes en total, 2 texturas
        // únicas. Evitar cambios de orden o contenido.
        let entities = json!([
            { "classname": "worldspawn", "properties": {} },
            { "classname": "light", "properties": { "intensity": 300 } },
            { "classname": "func_door", "properties": { "angle": 90 } }
        ]);
        let entity_brushes = json!([
            [
                { "texture": "base/stone", "planes": 6 },
                { "texture": "base/stone", "planes": 6 }
            ],
            [],
            [
                { "texture": "base/metal", "planes": 6 }
            ]
        ]);
        let texture_list = json!(["base/stone", "base/metal"]);

        StepRunResult::success([(constants::ENTITIES_KEY.to_string(), CtxValue::Leaf(entities)),
                                (constants::BRUSH_TABLE_KEY.to_string(), CtxValue::Leaf(entity_brushes)),
                                ("texture_list".to_string(), CtxValue::Leaf(texture_list))])
    }
}
