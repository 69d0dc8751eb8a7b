//! Fragmento de árbol: estructura `{ node, children }` anidada que
//! representa el árbol de salida, construida incrementalmente conforme se
//! fusionan los batches.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::NodeArtifact;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeFragment {
    /// Artifact registrado en esta posición del árbol (None para fragmentos
    /// intermedios cuyos nodos aún no se han producido).
    pub node: Option<NodeArtifact>,
    pub children: IndexMap<String, TreeFragment>,
}

impl TreeFragment {
    pub fn with_node(node: NodeArtifact) -> Self {
        Self { node: Some(node),
               children: IndexMap::new() }
    }

    /// Cantidad total de artifacts registrados en el subárbol.
    pub fn node_count(&self) -> usize {
        let own = usize::from(self.node.is_some());
        own + self.children.values().map(TreeFragment::node_count).sum::<usize>()
    }

    /// Desciende por una ruta de claves de hijo.
    pub fn find(&self, path: &[&str]) -> Option<&TreeFragment> {
        let mut current = self;
        for key in path {
            current = current.children.get(*key)?;
        }
        Some(current)
    }
}
