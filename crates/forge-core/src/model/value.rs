//! Valor de contexto como variante etiquetada explícita.
//!
//! Representar los valores como `Leaf | Nested | Node` hace que la recursión
//! del merge sea total y verificada por tipos, en lugar de depender de
//! contenedores anidados duck-typed. `Nested` usa `IndexMap` porque el orden
//! de inserción de entradas con valor de secuencia es significativo y debe
//! preservarse.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::NodeArtifact;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CtxValue {
    /// Valor hoja JSON (escalares y secuencias ordenadas incluidas).
    Leaf(Value),
    /// Mapping anidado que se fusiona recursivamente clave a clave.
    Nested(IndexMap<String, CtxValue>),
    /// Referencia opaca a un artifact de nodo (hoja a efectos de conflicto).
    Node(NodeArtifact),
}

impl CtxValue {
    pub fn leaf(value: impl Into<Value>) -> Self {
        CtxValue::Leaf(value.into())
    }

    pub fn nested<I>(entries: I) -> Self
        where I: IntoIterator<Item = (String, CtxValue)>
    {
        CtxValue::Nested(entries.into_iter().collect())
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            CtxValue::Leaf(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&IndexMap<String, CtxValue>> {
        match self {
            CtxValue::Nested(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&NodeArtifact> {
        match self {
            CtxValue::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Hoja con valor de secuencia, si lo es.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            CtxValue::Leaf(Value::Array(items)) => Some(items),
            _ => None,
        }
    }
}
