//! Artifact de nodo producido por los steps del pipeline.
//!
//! Un `NodeArtifact` es neutral: `payload` es JSON genérico y el core no
//! interpreta su semántica. Las tres banderas son las únicas capacidades que
//! el ensamblado del árbol consulta:
//! - `externally_wrapped`: el nodo ya está envuelto/poseído por otro
//!   subsistema; recibe ownership top-level directo y no se desciende en él.
//! - `owner_boundary`: el recorrido recursivo de asignación de owner se
//!   detiene en este nodo (sus descendientes conservan su owner propio).
//! - `managed`: marcado por el merger en cada nodo que el build crea;
//!   permite decidir con un test de pertenencia qué hijos son artefactos
//!   del build, sin recorrer jerarquías de tipos del host.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeArtifact {
    pub id: Uuid,
    pub name: String,
    /// Clase del nodo en el host (p.ej. "MeshInstance", "StaticBody").
    pub class: String,
    pub payload: Value,
    pub externally_wrapped: bool,
    pub owner_boundary: bool,
    pub managed: bool,
}

impl NodeArtifact {
    pub fn new(name: impl Into<String>, class: impl Into<String>, payload: Value) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               class: class.into(),
               payload,
               externally_wrapped: false,
               owner_boundary: false,
               managed: false }
    }

    /// Marca el artifact como pre-envuelto por otro subsistema.
    pub fn with_external_wrap(mut self) -> Self {
        self.externally_wrapped = true;
        self
    }

    /// Marca el artifact como frontera de propagación de ownership.
    pub fn with_owner_boundary(mut self) -> Self {
        self.owner_boundary = true;
        self
    }
}
