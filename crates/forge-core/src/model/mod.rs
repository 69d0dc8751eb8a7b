//! Modelo de datos del build: valores de contexto, contexto compartido,
//! artifacts de nodo y fragmentos de árbol.

mod artifact;
mod context;
mod tree;
mod value;

pub use artifact::NodeArtifact;
pub use context::BuildContext;
pub use tree::TreeFragment;
pub use value::CtxValue;
