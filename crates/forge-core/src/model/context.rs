//! Contexto de build: store compartido con clave string.
//!
//! Ciclo de vida: se crea vacío al inicio del build, se siembra con la
//! configuración estática y sólo lo mutan el engine y el merger — nunca un
//! job directamente. Los jobs reciben un slice privado por valor, de modo
//! que la ejecución concurrente no necesita locking.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::BuildError;
use super::CtxValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildContext {
    values: IndexMap<String, CtxValue>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CtxValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CtxValue)> {
        self.values.iter()
    }

    /// Inserta o fusiona `value` bajo `key`.
    ///
    /// Una clave ausente se inserta tal cual. Si la clave existe y ambos
    /// valores son `Nested`, se fusionan recursivamente clave a clave. Dos
    /// hojas (o formas incompatibles) bajo la misma clave son un conflicto:
    /// dos stages nunca deben producir la misma clave hoja.
    pub fn set(&mut self, key: &str, value: CtxValue) -> Result<(), BuildError> {
        match self.values.get_mut(key) {
            None => {
                self.values.insert(key.to_string(), value);
                Ok(())
            }
            Some(existing) => merge_value(existing, value, key),
        }
    }

    /// Copia superficial restringida a las claves solicitadas.
    ///
    /// Se usa para construir el contexto privado de un job. Una clave
    /// ausente falla con `MissingDependency` nombrando la clave y el step
    /// solicitante.
    pub fn slice(&self, step: &str, keys: &[String]) -> Result<BuildContext, BuildError> {
        let mut out = BuildContext::new();
        for key in keys {
            let value = self.values
                            .get(key)
                            .ok_or_else(|| BuildError::MissingDependency { step: step.to_string(),
                                                                           key: key.clone() })?;
            out.values.insert(key.clone(), value.clone());
        }
        Ok(out)
    }
}

/// Fusión recursiva de un valor entrante sobre uno existente.
fn merge_value(existing: &mut CtxValue, incoming: CtxValue, key: &str) -> Result<(), BuildError> {
    match (existing, incoming) {
        (CtxValue::Nested(current), CtxValue::Nested(new)) => {
            for (k, v) in new {
                match current.get_mut(&k) {
                    None => {
                        current.insert(k, v);
                    }
                    Some(slot) => merge_value(slot, v, &k)?,
                }
            }
            Ok(())
        }
        // Hoja contra hoja (o formas mezcladas): ilegal, nunca se pisa en
        // silencio un valor ya poblado.
        _ => Err(BuildError::ConflictingResult { key: key.to_string() }),
    }
}
