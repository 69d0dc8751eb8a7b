//! Fusión de resultados de batch y ensamblado del árbol de nodos.
//!
//! El fold del batch se hace en orden de `JobId` (ordenado), de modo que el
//! contexto fusionado es idéntico sin importar el orden no determinista en
//! que los workers terminaron. La clave estructural delega en el ensamblado
//! recursivo del árbol; el resto pasa por la fusión recursiva del contexto.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::constants;
use crate::errors::BuildError;
use crate::model::{BuildContext, CtxValue, NodeArtifact, TreeFragment};
use crate::scene::SceneHost;
use crate::scheduler::JobId;
use crate::step::JobResult;

/// Estado de recorrido del ensamblado: referencia explícita al último
/// artifact colgado, usada como fallback de attach cuando el fragmento
/// actual no tiene artifact registrado. Se enhebra por parámetro a través
/// de la recursión en lugar de vivir en un global oculto.
#[derive(Debug, Default)]
struct AttachState {
    last_attached: Option<NodeArtifact>,
}

pub struct ResultMerger {
    host: Arc<dyn SceneHost>,
    /// Owner designado del build: se asigna a cada descendiente creado.
    root_owner: NodeArtifact,
    tree: TreeFragment,
    /// Ids de todos los artifacts que este build creó (tag de capacidad
    /// "artefacto gestionado", consultable por pertenencia).
    managed: HashSet<Uuid>,
    state: AttachState,
}

impl ResultMerger {
    pub fn new(host: Arc<dyn SceneHost>, root: NodeArtifact) -> Self {
        Self { host,
               root_owner: root.clone(),
               tree: TreeFragment::with_node(root),
               managed: HashSet::new(),
               state: AttachState::default() }
    }

    /// Fusiona los resultados exitosos de un batch, en orden de `JobId`.
    pub fn merge_batch(&mut self,
                       context: &mut BuildContext,
                       mut batch: HashMap<JobId, JobResult>)
                       -> Result<(), BuildError> {
        let mut ids: Vec<JobId> = batch.keys().copied().collect();
        ids.sort();
        for id in ids {
            if let Some(result) = batch.remove(&id) {
                self.merge_result(context, result)?;
            }
        }
        Ok(())
    }

    /// Fusiona el resultado de un único job (también usado para los
    /// resultados de finalize, que son batches de un solo job).
    pub fn merge_result(&mut self, context: &mut BuildContext, result: JobResult) -> Result<(), BuildError> {
        for (key, value) in result {
            if key == constants::TREE_KEY {
                let entries = match value {
                    CtxValue::Nested(map) => map,
                    _ => return Err(BuildError::MalformedTreeResult { key }),
                };
                let Self { host, root_owner, tree, managed, state } = self;
                assemble(tree, &entries, state, host.as_ref(), root_owner, managed)?;
            } else {
                context.set(&key, value)?;
            }
        }
        Ok(())
    }

    pub fn tree(&self) -> &TreeFragment {
        &self.tree
    }

    pub fn is_managed(&self, id: Uuid) -> bool {
        self.managed.contains(&id)
    }

    /// Ids de los nodos creados por el build, en orden estable.
    pub fn managed_nodes(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.managed.iter().copied().collect();
        ids.sort();
        ids
    }
}

/// Ensamblado recursivo de un resultado estructural sobre un fragmento.
///
/// Cada entrada mapea una clave de nodo a un fragmento anidado (recursión) o
/// a un artifact crudo (attach). El padre del attach es el artifact
/// registrado del fragmento actual si existe en esta ruta; si no, el
/// fallback `last_attached` del estado de recorrido.
fn assemble(fragment: &mut TreeFragment,
            entries: &IndexMap<String, CtxValue>,
            state: &mut AttachState,
            host: &dyn SceneHost,
            root_owner: &NodeArtifact,
            managed: &mut HashSet<Uuid>)
            -> Result<(), BuildError> {
    for (key, entry) in entries {
        match entry {
            CtxValue::Nested(children) => {
                let child = fragment.children.entry(key.clone()).or_default();
                assemble(child, children, state, host, root_owner, managed)?;
            }
            CtxValue::Node(artifact) => {
                if fragment.children.get(key).map_or(false, |f| f.node.is_some()) {
                    // Equivalente estructural de pisar una clave hoja.
                    return Err(BuildError::ConflictingResult { key: key.clone() });
                }
                let mut node = artifact.clone();
                node.managed = true;

                let parent = fragment.node.clone();
                host.attach(parent.as_ref().or(state.last_attached.as_ref()), &node);

                if node.externally_wrapped {
                    // Pre-poseído por otro subsistema: ownership top-level
                    // directo, sin descender en sus descendientes.
                    host.assign_owner(&node, root_owner);
                } else {
                    assign_owner_walk(host, &node, root_owner);
                }

                managed.insert(node.id);
                state.last_attached = Some(node.clone());
                match fragment.children.entry(key.clone()) {
                    indexmap::map::Entry::Occupied(mut slot) => {
                        // Fragmento creado antes por hijos: registrar el nodo.
                        slot.get_mut().node = Some(node);
                    }
                    indexmap::map::Entry::Vacant(slot) => {
                        slot.insert(TreeFragment::with_node(node));
                    }
                }
            }
            CtxValue::Leaf(_) => return Err(BuildError::MalformedTreeResult { key: key.clone() }),
        }
    }
    Ok(())
}

/// Recorrido recursivo de asignación de ownership: el owner designado del
/// build se asigna al nodo y a cada descendiente, deteniéndose en los nodos
/// frontera excluidos de la propagación.
fn assign_owner_walk(host: &dyn SceneHost, node: &NodeArtifact, owner: &NodeArtifact) {
    host.assign_owner(node, owner);
    for child in host.children(node) {
        if child.owner_boundary {
            continue;
        }
        assign_owner_walk(host, &child, owner);
    }
}
