//! Colaborador de árbol del host.
//!
//! El ensamblado del árbol es el único consumidor de este trait; el core no
//! sabe ni le importa cómo el host materializa attach/ownership en su scene
//! graph real.

use crate::model::NodeArtifact;

pub trait SceneHost: Send + Sync {
    /// Cuelga `child` bajo `parent` (o como top-level si `parent` es None).
    fn attach(&self, parent: Option<&NodeArtifact>, child: &NodeArtifact);

    /// Asigna el owner de `node`.
    fn assign_owner(&self, node: &NodeArtifact, owner: &NodeArtifact);

    /// Descendientes directos de `node` según el host; alimenta el recorrido
    /// recursivo de asignación de ownership.
    fn children(&self, node: &NodeArtifact) -> Vec<NodeArtifact>;
}
