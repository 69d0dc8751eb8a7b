//! Host de escena de grabación: registra cada attach y asignación de owner
//! para que tests y demos puedan verificar el ensamblado del árbol sin un
//! scene graph real.

use std::collections::HashMap;
use std::sync::Mutex;

use forge_core::{NodeArtifact, SceneHost};
use uuid::Uuid;

#[derive(Default)]
pub struct RecordingSceneHost {
    /// (nombre del padre o None, nombre del hijo), en orden de attach.
    attaches: Mutex<Vec<(Option<String>, String)>>,
    /// (nombre del nodo, nombre del owner asignado).
    owners: Mutex<Vec<(String, String)>>,
    /// Grafo registrable: descendientes directos conocidos por el host.
    graph: Mutex<HashMap<Uuid, Vec<NodeArtifact>>>,
}

impl RecordingSceneHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declara descendientes pre-existentes de un nodo (para ejercitar el
    /// recorrido de ownership).
    pub fn register_children(&self, parent: &NodeArtifact, children: Vec<NodeArtifact>) {
        self.graph.lock().unwrap().insert(parent.id, children);
    }

    pub fn attaches(&self) -> Vec<(Option<String>, String)> {
        self.attaches.lock().unwrap().clone()
    }

    pub fn owners(&self) -> Vec<(String, String)> {
        self.owners.lock().unwrap().clone()
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.lock().unwrap().len()
    }

    pub fn owner_assignments_for(&self, node_name: &str) -> usize {
        self.owners.lock().unwrap().iter().filter(|(n, _)| n == node_name).count()
    }
}

impl SceneHost for RecordingSceneHost {
    fn attach(&self, parent: Option<&NodeArtifact>, child: &NodeArtifact) {
        self.attaches
            .lock()
            .unwrap()
            .push((parent.map(|p| p.name.clone()), child.name.clone()));
    }

    fn assign_owner(&self, node: &NodeArtifact, owner: &NodeArtifact) {
        self.owners.lock().unwrap().push((node.name.clone(), owner.name.clone()));
    }

    fn children(&self, node: &NodeArtifact) -> Vec<NodeArtifact> {
        self.graph.lock().unwrap().get(&node.id).cloned().unwrap_or_default()
    }
}
