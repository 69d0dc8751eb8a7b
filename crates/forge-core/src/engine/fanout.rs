//! Expansión de un stage en jobs según la forma de fan-out del step.
//!
//! La cantidad de jobs queda totalmente determinada aquí, antes de que corra
//! ningún job del stage: los jobs se materializan completos y un `run` no
//! puede alterar la cuenta a mitad de stage.

use std::sync::Arc;

use serde_json::Value;

use crate::constants;
use crate::errors::BuildError;
use crate::model::{BuildContext, CtxValue};
use crate::scheduler::{Job, JobId};
use crate::step::{BuildStep, FanOut};

/// Expande el step en sus jobs, con un slice privado por job.
///
/// La declaración del step se valida antes de armar slice alguno: requerir
/// la clave reservada del scheduler es un error de declaración, no una
/// dependencia ausente.
pub fn expand(step: &Arc<dyn BuildStep>, context: &BuildContext) -> Result<Vec<Job>, BuildError> {
    for key in step.required_inputs() {
        if key == constants::SCHEDULER_KEY {
            return Err(BuildError::InvalidStepDeclaration { step: step.name().to_string(),
                                                            key });
        }
    }
    match step.fan_out() {
        FanOut::Single => expand_single(step, context),
        FanOut::PerEntity => expand_per_entity(step, context),
        FanOut::PerBrush => expand_per_brush(step, context),
    }
}

fn base_slice(step: &Arc<dyn BuildStep>, context: &BuildContext) -> Result<BuildContext, BuildError> {
    context.slice(step.name(), &step.required_inputs())
}

fn expand_single(step: &Arc<dyn BuildStep>, context: &BuildContext) -> Result<Vec<Job>, BuildError> {
    Ok(vec![Job { id: JobId::Single,
                  step: Arc::clone(step),
                  ctx: base_slice(step, context)? }])
}

/// Secuencia de registros de entidad residente en el contexto.
fn entity_records(step: &str, context: &BuildContext) -> Result<Vec<Value>, BuildError> {
    match context.get(constants::ENTITIES_KEY) {
        None => Err(BuildError::MissingDependency { step: step.to_string(),
                                                    key: constants::ENTITIES_KEY.to_string() }),
        Some(value) => value.as_array()
                            .cloned()
                            .ok_or_else(|| BuildError::Internal(format!("context key '{}' is not a sequence",
                                                                        constants::ENTITIES_KEY))),
    }
}

/// Tabla de brushes por entidad (array de arrays) residente en el contexto.
fn brush_table(step: &str, context: &BuildContext) -> Result<Vec<Value>, BuildError> {
    match context.get(constants::BRUSH_TABLE_KEY) {
        None => Err(BuildError::MissingDependency { step: step.to_string(),
                                                    key: constants::BRUSH_TABLE_KEY.to_string() }),
        Some(value) => value.as_array()
                            .cloned()
                            .ok_or_else(|| BuildError::Internal(format!("context key '{}' is not a sequence",
                                                                        constants::BRUSH_TABLE_KEY))),
    }
}

fn expand_per_entity(step: &Arc<dyn BuildStep>, context: &BuildContext) -> Result<Vec<Job>, BuildError> {
    let records = entity_records(step.name(), context)?;
    let mut jobs = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let mut ctx = base_slice(step, context)?;
        ctx.set(constants::ENTITY_INDEX_KEY, CtxValue::leaf(index))?;
        ctx.set(constants::ENTITY_KEY, CtxValue::Leaf(record))?;
        jobs.push(Job { id: JobId::Entity(index),
                        step: Arc::clone(step),
                        ctx });
    }
    Ok(jobs)
}

fn expand_per_brush(step: &Arc<dyn BuildStep>, context: &BuildContext) -> Result<Vec<Job>, BuildError> {
    let records = entity_records(step.name(), context)?;
    let table = brush_table(step.name(), context)?;
    let mut jobs = Vec::new();
    for (entity_index, record) in records.into_iter().enumerate() {
        // Fila ausente en la tabla: cero brushes para esa entidad.
        let brushes = match table.get(entity_index) {
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(BuildError::Internal(format!("brush table row {entity_index} is not a sequence")))
            }
            None => Vec::new(),
        };
        for (brush_index, brush) in brushes.into_iter().enumerate() {
            let mut ctx = base_slice(step, context)?;
            ctx.set(constants::ENTITY_INDEX_KEY, CtxValue::leaf(entity_index))?;
            ctx.set(constants::ENTITY_KEY, CtxValue::Leaf(record.clone()))?;
            ctx.set(constants::BRUSH_INDEX_KEY, CtxValue::leaf(brush_index))?;
            ctx.set(constants::BRUSH_KEY, CtxValue::Leaf(brush))?;
            jobs.push(Job { id: JobId::Brush(entity_index, brush_index),
                            step: Arc::clone(step),
                            ctx });
        }
    }
    Ok(jobs)
}
